#[cfg(test)]
#[path = "service_type_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::EnumIter;
use strum::IntoEnumIterator;

/// Broad grouping of AWS services, used for diagram styling and rule checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ServiceCategory {
    Compute,
    Database,
    Network,
    Storage,
    Security,
    Integration,
    Management,
}

/// The closed set of AWS services a proposal may reference. Every component
/// and diagram node must carry one of these.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, strum::Display,
)]
pub enum ServiceType {
    #[serde(rename = "EC2")]
    #[strum(serialize = "EC2")]
    Ec2,
    Lambda,
    #[serde(rename = "ECS")]
    #[strum(serialize = "ECS")]
    Ecs,
    Fargate,
    #[serde(rename = "EKS")]
    #[strum(serialize = "EKS")]
    Eks,
    ElasticBeanstalk,
    #[serde(rename = "RDS")]
    #[strum(serialize = "RDS")]
    Rds,
    DynamoDB,
    ElastiCache,
    Aurora,
    Redshift,
    #[serde(rename = "VPC")]
    #[strum(serialize = "VPC")]
    Vpc,
    #[serde(rename = "ELB")]
    #[strum(serialize = "ELB")]
    Elb,
    #[serde(rename = "ALB")]
    #[strum(serialize = "ALB")]
    Alb,
    #[serde(rename = "NLB")]
    #[strum(serialize = "NLB")]
    Nlb,
    CloudFront,
    Route53,
    #[serde(rename = "APIGateway")]
    #[strum(serialize = "APIGateway")]
    ApiGateway,
    S3,
    #[serde(rename = "EFS")]
    #[strum(serialize = "EFS")]
    Efs,
    #[serde(rename = "EBS")]
    #[strum(serialize = "EBS")]
    Ebs,
    #[serde(rename = "IAM")]
    #[strum(serialize = "IAM")]
    Iam,
    Cognito,
    #[serde(rename = "WAF")]
    #[strum(serialize = "WAF")]
    Waf,
    Shield,
    #[serde(rename = "SQS")]
    #[strum(serialize = "SQS")]
    Sqs,
    #[serde(rename = "SNS")]
    #[strum(serialize = "SNS")]
    Sns,
    EventBridge,
    CloudWatch,
    CloudTrail,
    CloudFormation,
}

fn normalize(text: &str) -> String {
    let mut cleaned = text
        .chars()
        .filter(|c| return !c.is_whitespace() && *c != '-' && *c != '_' && *c != '.')
        .collect::<String>()
        .to_lowercase();

    for prefix in ["amazon", "aws"] {
        if cleaned.len() > prefix.len() && cleaned.starts_with(prefix) {
            cleaned = cleaned[prefix.len()..].to_string();
        }
    }

    return cleaned;
}

impl ServiceType {
    /// Resolves a model-provided label to a service type. Case, whitespace,
    /// dashes, underscores and a leading "Amazon"/"AWS" are ignored. Unknown
    /// labels return `None`; there is no fallback type.
    pub fn parse(text: &str) -> Option<ServiceType> {
        let needle = normalize(text);
        if needle.is_empty() {
            return None;
        }

        return ServiceType::iter().find(|e| return normalize(&e.to_string()) == needle);
    }

    pub fn names() -> Vec<String> {
        return ServiceType::iter()
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();
    }

    pub fn category(&self) -> ServiceCategory {
        match self {
            ServiceType::Ec2
            | ServiceType::Lambda
            | ServiceType::Ecs
            | ServiceType::Fargate
            | ServiceType::Eks
            | ServiceType::ElasticBeanstalk => return ServiceCategory::Compute,
            ServiceType::Rds
            | ServiceType::DynamoDB
            | ServiceType::ElastiCache
            | ServiceType::Aurora
            | ServiceType::Redshift => return ServiceCategory::Database,
            ServiceType::Vpc
            | ServiceType::Elb
            | ServiceType::Alb
            | ServiceType::Nlb
            | ServiceType::CloudFront
            | ServiceType::Route53
            | ServiceType::ApiGateway => return ServiceCategory::Network,
            ServiceType::S3 | ServiceType::Efs | ServiceType::Ebs => {
                return ServiceCategory::Storage
            }
            ServiceType::Iam | ServiceType::Cognito | ServiceType::Waf | ServiceType::Shield => {
                return ServiceCategory::Security
            }
            ServiceType::Sqs | ServiceType::Sns | ServiceType::EventBridge => {
                return ServiceCategory::Integration
            }
            ServiceType::CloudWatch | ServiceType::CloudTrail | ServiceType::CloudFormation => {
                return ServiceCategory::Management
            }
        }
    }
}
