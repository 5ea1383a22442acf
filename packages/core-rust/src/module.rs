//! Analytic modules (report panels) tracked by the log store.
//!
//! The module set is fixed at compile time. Each module's ordinal is part of
//! the persisted namespace names (see [`crate::namespace`]), so the order of
//! [`Module::ALL`] must never change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An analytic dimension of the log report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Module {
    /// Unique visitors per day.
    Visitors,
    /// Requested files (dynamic content).
    Requests,
    /// Requested static files.
    RequestsStatic,
    /// Requests answered with 404.
    NotFound,
    /// Visitor hostnames and IPs.
    Hosts,
    /// Operating systems.
    Os,
    /// Browsers.
    Browsers,
    /// Time distribution (per hour).
    VisitTimes,
    /// Virtual hosts.
    VirtualHosts,
    /// Referring URLs.
    Referrers,
    /// Referring sites.
    ReferringSites,
    /// Search engine keyphrases.
    Keyphrases,
    /// Geo location (country/continent).
    GeoLocation,
    /// HTTP status codes.
    StatusCodes,
}

impl Module {
    /// Every module, in ordinal order.
    pub const ALL: [Module; 14] = [
        Module::Visitors,
        Module::Requests,
        Module::RequestsStatic,
        Module::NotFound,
        Module::Hosts,
        Module::Os,
        Module::Browsers,
        Module::VisitTimes,
        Module::VirtualHosts,
        Module::Referrers,
        Module::ReferringSites,
        Module::Keyphrases,
        Module::GeoLocation,
        Module::StatusCodes,
    ];

    /// Position of the module in [`Module::ALL`].
    #[must_use]
    pub fn ordinal(self) -> u32 {
        self as u32
    }

    /// Upper-case panel name, as accepted on the command line.
    #[must_use]
    pub fn panel_name(self) -> &'static str {
        match self {
            Module::Visitors => "VISITORS",
            Module::Requests => "REQUESTS",
            Module::RequestsStatic => "REQUESTS_STATIC",
            Module::NotFound => "NOT_FOUND",
            Module::Hosts => "HOSTS",
            Module::Os => "OS",
            Module::Browsers => "BROWSERS",
            Module::VisitTimes => "VISIT_TIMES",
            Module::VirtualHosts => "VIRTUAL_HOSTS",
            Module::Referrers => "REFERRERS",
            Module::ReferringSites => "REFERRING_SITES",
            Module::Keyphrases => "KEYPHRASES",
            Module::GeoLocation => "GEO_LOCATION",
            Module::StatusCodes => "STATUS_CODES",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.panel_name())
    }
}

/// Returned when a panel name does not match any [`Module`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown module: {0}")]
pub struct UnknownModule(pub String);

impl FromStr for Module {
    type Err = UnknownModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.panel_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownModule(s.to_string()))
    }
}
