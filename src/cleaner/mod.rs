pub mod executor;
pub mod journal;
pub mod uninstall;

pub use executor::{
    DeletionTarget, ExecutionResult, Executor, FailedItem, FsRemover, PathRemover, SkipReason,
    SkippedItem,
};
pub use journal::{HistoryJournal, JournalAction, JournalEntry};
pub use uninstall::{uninstall, UninstallResult};
