//! Command-line surface for `tally`.
//!
//! One subcommand per tracking operation, plus log inspection. Landing
//! context (referrer and `utm_*` parameters) is accepted by the commands
//! that model a page load.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tally_core::CampaignParams;
use tally_types::Payload;

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    about = "Deterministic A/B variant assignment and local event logging",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Config file (default: `TALLY_CONFIG`, then `tally.yaml` if present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the anonymous id and assigned variants.
    Segment,

    /// Emit `variant_impression` for a page.
    Impression {
        /// Page path.
        page: String,
        #[command(flatten)]
        landing: LandingArgs,
    },

    /// Emit `affiliate_click` with variant data.
    Click {
        /// Product name.
        product: String,
        /// Destination URL.
        url: String,
    },

    /// Emit `page_view`.
    View {
        /// Page path.
        page: String,
        #[command(flatten)]
        landing: LandingArgs,
    },

    /// Emit any event.
    Emit {
        /// Event name.
        name: String,
        /// Event parameters as a JSON object.
        #[arg(value_parser = parse_payload)]
        payload: Option<Payload>,
    },

    /// Print the persisted event log.
    Events,

    /// Delete the persisted event log.
    Clear,

    /// Register a visit and print the summary with its traffic source.
    Visit {
        #[command(flatten)]
        landing: LandingArgs,
    },
}

/// Where the current page load came from.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct LandingArgs {
    /// Referring URL.
    #[arg(long, value_name = "URL")]
    pub referrer: Option<String>,

    /// `utm_source` of the landing URL.
    #[arg(long, value_name = "SOURCE")]
    pub utm_source: Option<String>,

    /// `utm_medium` of the landing URL.
    #[arg(long, value_name = "MEDIUM")]
    pub utm_medium: Option<String>,

    /// `utm_campaign` of the landing URL.
    #[arg(long, value_name = "CAMPAIGN")]
    pub utm_campaign: Option<String>,
}

impl LandingArgs {
    /// The campaign parameters given on the command line.
    pub fn campaign(&self) -> CampaignParams {
        CampaignParams {
            source: self.utm_source.clone(),
            medium: self.utm_medium.clone(),
            campaign: self.utm_campaign.clone(),
        }
    }
}

fn parse_payload(raw: &str) -> Result<Payload, String> {
    serde_json::from_str(raw).map_err(|e| format!("payload must be a JSON object: {e}"))
}
