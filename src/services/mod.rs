pub mod adf;
pub mod jira_client;

pub use jira_client::{JiraClient, JiraCredentials, JiraError};
