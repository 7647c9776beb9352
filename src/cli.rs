use std::num::NonZeroU16;

use clap::Parser;

use crate::constants::{DEFAULT_ORIGIN, DEFAULT_PASSWORD, DEFAULT_USERNAME};

#[derive(Parser, Debug, Clone)]
pub struct Cli {
    #[clap(short, long, default_value = "8000", env = "PORT")]
    pub port: NonZeroU16,

    #[clap(long, default_value = "127.0.0.1", env = "HOST")]
    pub host: String,

    /// Base URL of the origin that validates signed URLs
    #[clap(long, default_value = DEFAULT_ORIGIN, env = "ORIGIN")]
    pub origin: String,

    #[clap(long, default_value = DEFAULT_USERNAME, env = "POC_USERNAME")]
    pub username: String,

    #[clap(long, default_value = DEFAULT_PASSWORD, env = "POC_PASSWORD")]
    pub password: String,

    /// Key-pair identifier the origin uses to look up the verification key
    #[clap(long, env = "PUBLIC_KEY")]
    pub public_key: String,

    /// PEM-encoded RSA private key used to sign origin URLs
    #[clap(long, env = "PRIVATE_KEY", default_value = "")]
    pub private_key: String,

    /// Base64-encoded override for the private key, decoded once at startup
    #[clap(long, env = "PRIVATE_KEY_B64")]
    pub private_key_b64: Option<String>,
}
