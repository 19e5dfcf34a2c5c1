use std::fmt;
use std::str::FromStr;

/// Logical remote operations understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Route {
    FetchRealNews,
    VerifyNewsDates,
    ClearAllNews,
    ResetSources,
    SendToTelegram,
    SendToWhatsApp,
    SendToTeams,
    SendToEmail,
    GenerateNews,
}

impl Route {
    pub const ALL: [Route; 9] = [
        Route::FetchRealNews,
        Route::VerifyNewsDates,
        Route::ClearAllNews,
        Route::ResetSources,
        Route::SendToTelegram,
        Route::SendToWhatsApp,
        Route::SendToTeams,
        Route::SendToEmail,
        Route::GenerateNews,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::FetchRealNews => "fetchRealNews",
            Route::VerifyNewsDates => "verifyNewsDates",
            Route::ClearAllNews => "clearAllNews",
            Route::ResetSources => "resetSources",
            Route::SendToTelegram => "sendToTelegram",
            Route::SendToWhatsApp => "sendToWhatsApp",
            Route::SendToTeams => "sendToTeams",
            Route::SendToEmail => "sendToEmail",
            Route::GenerateNews => "generateNews",
        }
    }

    pub fn default_path(&self) -> &'static str {
        match self {
            Route::FetchRealNews => "/integrations/news/fetch",
            Route::VerifyNewsDates => "/integrations/news/verify-dates",
            Route::ClearAllNews => "/news/clear",
            Route::ResetSources => "/sources/reset",
            Route::SendToTelegram => "/integrations/telegram/send-test",
            Route::SendToWhatsApp => "/integrations/whatsapp/send-test",
            Route::SendToTeams => "/integrations/teams/send-test",
            Route::SendToEmail => "/integrations/email/send-test",
            Route::GenerateNews => "/integrations/news/generate",
        }
    }

    /// Suffix of the environment variable that overrides this route's path,
    /// e.g. `FETCH_REAL_NEWS`.
    pub fn env_suffix(&self) -> &'static str {
        match self {
            Route::FetchRealNews => "FETCH_REAL_NEWS",
            Route::VerifyNewsDates => "VERIFY_NEWS_DATES",
            Route::ClearAllNews => "CLEAR_NEWS",
            Route::ResetSources => "RESET_SOURCES",
            Route::SendToTelegram => "SEND_TELEGRAM",
            Route::SendToWhatsApp => "SEND_WHATSAPP",
            Route::SendToTeams => "SEND_TEAMS",
            Route::SendToEmail => "SEND_EMAIL",
            Route::GenerateNews => "GENERATE_NEWS",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::ALL
            .iter()
            .copied()
            .find(|route| route.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown route: {}", s))
    }
}
