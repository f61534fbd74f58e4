pub mod issue;
pub mod issue_update;
