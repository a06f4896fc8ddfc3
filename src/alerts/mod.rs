/// Alert deduplication, issue reporting and alert metadata storage
pub mod dedup;
pub mod description;
pub mod record;
pub mod store;
pub mod tracker;

pub use dedup::{is_new_alert, SiblingWindow, DEFAULT_MIN_RUNS_BETWEEN_CHANGE_POINTS};
pub use description::{
    issue_description, issue_title, merge_labels, ChangePointReport, DEFAULT_ALERT_LABEL,
    DEFAULT_MAX_RESULTS_TO_DISPLAY,
};
pub use record::{alert_table_name, sanitize_identifier, AlertRecord};
pub use store::{AlertStore, InMemoryAlertStore, JsonlAlertStore, DEFAULT_MAX_PRIOR_ALERTS};
pub use tracker::{GitHubIssueTracker, IssueRef, IssueRequest, IssueTracker, LogIssueTracker};
