//! Mount a file system on a remote host as another user.
//!
//! Demonstrates a two-step sequence on one channel: `sudo su -` elevates,
//! then the `mount` line is fed to the elevated shell.
//!
//! # Prerequisites
//!
//! - SSH server reachable on the target host
//! - The login user may run `sudo su` without a password prompt
//!
//! # Usage
//!
//! ```bash
//! cargo run --example mount_filesystem -- --host host01.acme.com --user deploy \
//!     --key ~/.ssh/id_ed25519 --source /dev/sdb1 --target /mnt/data
//! ```

use std::env;

use sshcmd::{CommandSequence, SessionClient, SessionConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut builder = SessionConfig::builder(&args.host, &args.user)
        .port(args.port)
        .connection_timeout(args.timeout)
        .command_timeout(args.timeout);

    if let Some(password) = &args.password {
        builder = builder.password(password);
    }
    if let Some(key) = &args.key {
        builder = builder.private_key_file(key);
    }

    let client = SessionClient::new(builder.build()?);

    let commands = CommandSequence::single(sudo_su_command(&args.su_as))
        .then(format!("mount {} {}", args.source, args.target));

    let result = client.execute_remote_command(&commands).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.status() || result.exit_code() != Some(0) {
        std::process::exit(1);
    }
    Ok(())
}

/// Build the elevation command for `user`.
fn sudo_su_command(user: &str) -> String {
    let user = user.to_lowercase();
    if user == "root" {
        "sudo su -".to_string()
    } else {
        format!("sudo su - {user}")
    }
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<String>,
    timeout: u64,
    su_as: String,
    source: String,
    target: String,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            port: 22,
            user: env::var("USER").unwrap_or_else(|_| "root".to_string()),
            password: None,
            key: None,
            timeout: 30,
            su_as: "root".to_string(),
            source: String::new(),
            target: String::new(),
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match (args[i].as_str(), value) {
                ("--host" | "-h", Some(v)) => parsed.host = v,
                ("--port" | "-p", Some(v)) => parsed.port = v.parse().unwrap_or(22),
                ("--user" | "-u", Some(v)) => parsed.user = v,
                ("--password" | "-P", Some(v)) => parsed.password = Some(v),
                ("--key" | "-k", Some(v)) => parsed.key = Some(v),
                ("--timeout" | "-t", Some(v)) => parsed.timeout = v.parse().unwrap_or(30),
                ("--su-as", Some(v)) => parsed.su_as = v,
                ("--source", Some(v)) => parsed.source = v,
                ("--target", Some(v)) => parsed.target = v,
                ("--help", _) => {
                    Self::print_help();
                    std::process::exit(0);
                }
                (other, _) => {
                    eprintln!("Unknown or incomplete argument: {other}");
                    std::process::exit(2);
                }
            }
            i += 2;
        }

        if parsed.source.is_empty() || parsed.target.is_empty() {
            eprintln!("Error: --source and --target are required");
            std::process::exit(2);
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"sshcmd mount_filesystem example

USAGE:
    cargo run --example mount_filesystem -- [OPTIONS] --source <DEV> --target <DIR>

OPTIONS:
    -h, --host <HOST>        Target host [default: localhost]
    -p, --port <PORT>        SSH port [default: 22]
    -u, --user <USER>        Username [default: $USER]
    -P, --password <PASS>    Password (or key passphrase)
    -k, --key <PATH>         Path to SSH private key
    -t, --timeout <SECS>     Connection and command timeout [default: 30]
        --su-as <USER>       User to switch to before mounting [default: root]
        --source <DEV>       Device or network location to mount
        --target <DIR>       Mount point
        --help               Print this help message
"#
        );
    }
}
