use anyhow::Result;
use test_utils::architecture_fixture;

use super::describe_violations;
use super::improvement_prompt;
use super::violation_warnings;
use super::Condition;
use super::RuleSet;
use crate::domain::models::Architecture;
use crate::domain::models::BackendName;
use crate::domain::models::Component;
use crate::domain::models::ServiceType;
use crate::domain::services::prompts::PromptComposer;

fn fixture() -> Architecture {
    return serde_json::from_str(architecture_fixture()).unwrap();
}

#[test]
fn it_parses_rule_files() -> Result<()> {
    let rule = RuleSet::parse(
        "fallback",
        "# No servers\n\nPrefer managed compute.\nKeep it simple.\n\n## Conditions\n- Must not use EC2\n- must use amazon s3\n- Something else entirely\n",
    )?;

    assert_eq!(rule.name, "No servers");
    assert_eq!(rule.description, "Prefer managed compute. Keep it simple.");
    assert_eq!(
        rule.conditions,
        vec![
            Condition::MustNotUse(ServiceType::Ec2),
            Condition::MustUse(ServiceType::S3),
        ]
    );

    return Ok(());
}

#[test]
fn it_falls_back_to_file_name() -> Result<()> {
    let rule = RuleSet::parse("untitled", "## Conditions\n- Requires a security component")?;
    assert_eq!(rule.name, "untitled");
    assert_eq!(rule.description, "");
    assert_eq!(rule.conditions, vec![Condition::SecurityComponent]);

    return Ok(());
}

#[test]
fn it_ignores_unknown_service_types() -> Result<()> {
    let rule = RuleSet::parse("x", "# X\n\n## Conditions\n- Must use Kinesis")?;
    assert!(rule.conditions.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_loads_rules_sorted_by_file_name() -> Result<()> {
    let rule_set = RuleSet::load("./test/rules").await?;

    let names = rule_set
        .rules
        .iter()
        .map(|e| return e.name.to_string())
        .collect::<Vec<String>>();
    assert_eq!(
        names,
        vec![
            "Security baseline".to_string(),
            "High availability".to_string(),
            "Cost awareness".to_string(),
        ]
    );
    assert_eq!(
        rule_set.rules[1].conditions,
        vec![
            Condition::MultiAz,
            Condition::MustNotUse(ServiceType::ElasticBeanstalk),
        ]
    );

    return Ok(());
}

#[tokio::test]
async fn it_loads_nothing_from_missing_dir() -> Result<()> {
    assert!(RuleSet::load("./test/no-such-rules").await?.rules.is_empty());
    assert!(RuleSet::load("").await?.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_reports_violations() -> Result<()> {
    let rule_set = RuleSet::load("./test/rules").await?;
    let violations = rule_set.validate(&fixture());

    assert_eq!(violations.len(), 3);
    assert_eq!(violations[0].rule, "Security baseline");
    assert_eq!(violations[0].reason, "The design must use IAM but does not.");
    assert_eq!(
        violations[1].reason,
        "The design does not describe a multi-AZ deployment."
    );
    assert_eq!(
        violations[2].reason,
        "The design does not address cost optimization."
    );

    return Ok(());
}

#[tokio::test]
async fn it_passes_compliant_architectures() -> Result<()> {
    let rule_set = RuleSet::load("./test/rules").await?;
    let mut arch = fixture();
    arch.components.push(Component {
        name: "Access".to_string(),
        service_type: ServiceType::Iam,
        description: "".to_string(),
    });
    arch.decisions
        .push("Run the database Multi-AZ for failover.".to_string());
    arch.practices
        .push("Use reserved instances to reduce cost.".to_string());

    assert!(rule_set.validate(&arch).is_empty());

    return Ok(());
}

#[test]
fn it_describes_violations() {
    let violations = vec![super::Violation {
        rule: "Security baseline".to_string(),
        description: "Protect entry points.".to_string(),
        reason: "The design must use IAM but does not.".to_string(),
    }];

    insta::assert_snapshot!(describe_violations(&violations), @r###"
    1. Security baseline: The design must use IAM but does not.
       Protect entry points.
    "###);
    assert_eq!(
        violation_warnings(&violations),
        vec!["Security baseline: The design must use IAM but does not.".to_string()]
    );
}

#[tokio::test]
async fn it_builds_improvement_prompts() -> Result<()> {
    let rule_set = RuleSet::load("./test/rules").await?;
    let arch = fixture();
    let violations = rule_set.validate(&arch);
    let composer = PromptComposer::new("", BackendName::Qianwen);

    let prompt = improvement_prompt(&composer, &arch, &violations, "A web app").await?;
    assert!(prompt.contains("1. Security baseline: The design must use IAM but does not."));
    assert!(prompt.contains("3. Cost awareness"));
    assert!(prompt.contains("A web app"));

    return Ok(());
}
