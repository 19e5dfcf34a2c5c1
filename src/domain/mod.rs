pub mod channel;
pub mod news;
pub mod record;
pub mod report;
pub mod source;
pub mod taxonomy;

pub use channel::{Channel, ChannelConfig, EmailConfig, TeamsConfig, TelegramConfig, WhatsAppConfig};
pub use news::News;
pub use record::{Record, RecordMeta};
pub use report::{
    ClearReport, DateCheck, DateCheckStatus, DateVerificationReport, FetchReport, ImportanceAnalysis, NewsDraft,
    ResetReport, SendPreview, SendReceipt, TriageVerdict,
};
pub use source::{CredibilityLevel, Source, UpdateMethod};
pub use taxonomy::{Category, CategoryFilter, Importance};
