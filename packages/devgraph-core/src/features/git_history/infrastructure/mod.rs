mod git_executor;
mod history_reader;
mod log_parser;

pub use git_executor::GitExecutor;
pub use history_reader::GitHistoryReader;
pub use log_parser::{parse_name_status_log, parse_numstat, LOG_PRETTY_FORMAT};
