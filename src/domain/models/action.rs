use super::ArchitectError;
use super::PendingTurn;
use super::Resolution;

#[derive(Debug)]
pub enum Action {
    BackendAbort(),
    BackendRequest(String),
    BackendResolved(PendingTurn, Box<Result<Resolution, ArchitectError>>),
    Quit(),
}
