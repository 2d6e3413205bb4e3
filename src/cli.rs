use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::profile::outbound::OutboundDefinition;

#[derive(Parser)]
#[command(
    version,
    about = "Decode share links and subscriptions, generate V2Ray-style kernel configs",
    long_about = None
)]
pub struct Args {
    #[arg(short, long, global = true, help = "Emit debug log")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Decode a share link and print the outbound as JSON
    Decode {
        #[arg(help = "Share link (http://, socks://, ss://, vmess://, vless://)")]
        link: String,
    },

    /// Encode an outbound JSON document into a share link
    Encode {
        #[arg(help = "JSON file with `name` and `outbound`, accept file path or URL")]
        file: String,
    },

    /// Decode a subscription payload and print its outbounds as JSON
    Subscription {
        #[arg(help = "Subscription, accept file path or URL")]
        source: String,
    },

    /// Expand a profile and generate the kernel config
    Generate {
        #[arg(short, long, help = "Profile JSON, accept file path or URL")]
        profile: String,

        #[arg(short, long, help = "Settings TOML, accept file path or URL")]
        settings: Option<String>,

        #[arg(short, long, help = "Config output path, stdout when omitted")]
        output: Option<String>,
    },
}

/// A named outbound as read by `encode` and printed by `decode`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LinkDocument {
    pub name: String,
    pub outbound: OutboundDefinition,
}

impl From<(String, OutboundDefinition)> for LinkDocument {
    fn from((name, outbound): (String, OutboundDefinition)) -> Self {
        Self { name, outbound }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let args = Args::parse_from([
            "routeforge",
            "generate",
            "--profile",
            "profile.json",
            "-o",
            "config.json",
            "-v",
        ]);
        assert!(args.verbose);
        let Command::Generate {
            profile,
            settings,
            output,
        } = args.command
        else {
            panic!("Expected generate command");
        };
        assert_eq!(profile, "profile.json");
        assert!(settings.is_none());
        assert_eq!(output.as_deref(), Some("config.json"));
    }

    #[test]
    fn test_parse_decode() {
        let args = Args::parse_from(["routeforge", "decode", "socks://h:1080"]);
        assert!(!args.verbose);
        let Command::Decode { link } = args.command else {
            panic!("Expected decode command");
        };
        assert_eq!(link, "socks://h:1080");
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Args::try_parse_from(["routeforge"]).is_err());
    }

    #[test]
    fn test_link_document_json() {
        let doc = LinkDocument::from((
            "direct".to_string(),
            OutboundDefinition::freedom("direct"),
        ));
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: LinkDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
    }
}
