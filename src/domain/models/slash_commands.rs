#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

pub struct SlashCommand {
    command: String,
    pub args: Vec<String>,
}

impl SlashCommand {
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let mut args = text
            .split_whitespace()
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();
        if args.is_empty() {
            return None;
        }
        let prefix = args[0].to_string();
        args.remove(0);

        let cmd = SlashCommand {
            command: prefix,
            args,
        };
        if cmd.is_quit()
            || cmd.is_new_session()
            || cmd.is_session_list()
            || cmd.is_switch_session()
            || cmd.is_rename_session()
            || cmd.is_delete_session()
            || cmd.is_show()
            || cmd.is_raw()
            || cmd.is_export()
            || cmd.is_diagram()
            || cmd.is_retry()
            || cmd.is_copy()
            || cmd.is_cancel()
            || cmd.is_help()
        {
            return Some(cmd);
        }

        return None;
    }

    /// Arguments joined back into a single string.
    pub fn arg_text(&self) -> String {
        return self.args.join(" ");
    }

    pub fn is_quit(&self) -> bool {
        return ["/q", "/quit", "/exit"].contains(&self.command.as_str());
    }

    pub fn is_new_session(&self) -> bool {
        return ["/n", "/new"].contains(&self.command.as_str());
    }

    pub fn is_session_list(&self) -> bool {
        return ["/s", "/sessions"].contains(&self.command.as_str());
    }

    pub fn is_switch_session(&self) -> bool {
        return ["/sw", "/switch"].contains(&self.command.as_str());
    }

    pub fn is_rename_session(&self) -> bool {
        return ["/rn", "/rename"].contains(&self.command.as_str());
    }

    pub fn is_delete_session(&self) -> bool {
        return ["/d", "/delete"].contains(&self.command.as_str());
    }

    pub fn is_show(&self) -> bool {
        return ["/show"].contains(&self.command.as_str());
    }

    pub fn is_raw(&self) -> bool {
        return ["/raw"].contains(&self.command.as_str());
    }

    pub fn is_export(&self) -> bool {
        return ["/e", "/export"].contains(&self.command.as_str());
    }

    pub fn is_diagram(&self) -> bool {
        return ["/dg", "/diagram"].contains(&self.command.as_str());
    }

    pub fn is_retry(&self) -> bool {
        return ["/r", "/retry"].contains(&self.command.as_str());
    }

    pub fn is_copy(&self) -> bool {
        return ["/c", "/copy"].contains(&self.command.as_str());
    }

    pub fn is_cancel(&self) -> bool {
        return ["/cancel"].contains(&self.command.as_str());
    }

    pub fn is_help(&self) -> bool {
        return ["/h", "/help"].contains(&self.command.as_str());
    }
}
