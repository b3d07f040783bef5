use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;

use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// Include the generated proto code
pub mod proto {
    tonic::include_proto!("stater");
}

use proto::{
    stater_service_client::StaterServiceClient, CallStatus, InvokeMethodRequest,
    ListRespondersRequest,
};

/// Get the default socket path based on user permissions
fn default_socket_path() -> String {
    #[cfg(target_os = "linux")]
    {
        // Prefer XDG_RUNTIME_DIR if set (usually /run/user/$UID)
        if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
            return format!("{}/stater.sock", dir);
        }
        // Fallback to /run/user/$EUID
        let euid = unsafe { libc::geteuid() as u32 };
        if euid == 0 {
            "/var/run/stater.sock".to_string()
        } else {
            format!("/run/user/{}/stater.sock", euid)
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        "/var/run/stater.sock".to_string()
    }
}

/// CLI tool for interacting with the stater service
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the Unix socket for the stater service
    #[arg(short, long)]
    socket: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration information including detected socket path
    Info,

    /// List registered responders and their channels
    Responders,

    /// Query the platform version over a channel
    Version {
        /// Channel to query
        #[arg(short, long, default_value = "stater")]
        channel: String,
    },

    /// Invoke an arbitrary method over a channel
    Call {
        /// Method name to invoke
        method: String,

        /// Optional call arguments as a JSON document
        #[arg(short, long)]
        args: Option<String>,

        /// Channel to invoke on
        #[arg(short, long, default_value = "stater")]
        channel: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Use provided socket or compute default at runtime
    let socket_path = cli.socket.unwrap_or_else(default_socket_path);

    // Handle info command before connecting (it doesn't need a connection)
    if matches!(cli.command, Commands::Info) {
        return cmd_info(&socket_path);
    }

    // Connect to the stater service for other commands
    let mut client = connect_to_service(&socket_path).await?;

    match cli.command {
        Commands::Info => unreachable!(), // Already handled above
        Commands::Responders => cmd_responders(&mut client).await?,
        Commands::Version { channel } => cmd_version(&mut client, &channel).await?,
        Commands::Call {
            method,
            args,
            channel,
        } => cmd_call(&mut client, &channel, &method, args.as_deref()).await?,
    }

    Ok(())
}

async fn connect_to_service(socket_path: &str) -> Result<StaterServiceClient<Channel>> {
    debug!("Connecting to stater service at {}", socket_path);

    let socket_path = socket_path.to_string();
    let channel = Endpoint::try_from("http://[::]:50051")?
        .connect_with_connector(service_fn(move |_: Uri| {
            let socket_path = socket_path.clone();
            async move {
                let stream = UnixStream::connect(&socket_path).await?;
                Ok::<_, std::io::Error>(hyper_util::rt::TokioIo::new(stream))
            }
        }))
        .await
        .context("Failed to connect to stater service")?;

    Ok(StaterServiceClient::new(channel))
}

fn cmd_info(socket_path: &str) -> Result<()> {
    println!("{}", "Stater CLI Configuration".cyan().bold());
    println!("{}", "========================".cyan());
    println!();

    // Show detected socket path
    println!("{}: {}", "Socket Path".yellow(), socket_path.green());

    // Show how it was determined
    let euid = unsafe { libc::geteuid() as u32 };
    if let Ok(xdg) = std::env::var("XDG_RUNTIME_DIR") {
        println!(
            "{}: {} (from XDG_RUNTIME_DIR)",
            "Detection Method".yellow(),
            "XDG Runtime Directory".cyan()
        );
        println!("{}: {}", "XDG_RUNTIME_DIR".yellow(), xdg);
    } else if euid == 0 {
        println!("{}: {}", "Detection Method".yellow(), "Root User".cyan());
    } else {
        println!(
            "{}: {}",
            "Detection Method".yellow(),
            "User Runtime Directory".cyan()
        );
        println!("{}: {}", "User ID".yellow(), euid);
    }

    // Platform info
    println!();
    println!("{}: {}", "Platform".yellow(), std::env::consts::OS);
    println!("{}: {}", "Architecture".yellow(), std::env::consts::ARCH);

    println!();
    println!("{}", "Tips:".cyan().bold());
    println!("• The socket path is automatically detected based on your user permissions");
    println!("• Root users use: /var/run/stater.sock");
    println!("• Regular users use: $XDG_RUNTIME_DIR/stater.sock or /run/user/$UID/stater.sock");
    println!("• You can override with: --socket /custom/path.sock");
    println!();
    println!(
        "To test the connection, run: {}",
        "stater-cli version".green()
    );

    Ok(())
}

async fn cmd_responders(client: &mut StaterServiceClient<Channel>) -> Result<()> {
    let response = client
        .list_responders(ListRespondersRequest {})
        .await
        .context("Failed to list responders")?;

    let responders = response.into_inner().responders;
    if responders.is_empty() {
        println!("{}", "No responders registered".yellow());
        return Ok(());
    }

    for responder in responders {
        let registered_at = chrono::DateTime::from_timestamp(responder.registered_at, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());

        println!(
            "{} {}",
            responder.channel.cyan().bold(),
            format!("({})", responder.responder_id).dimmed()
        );
        println!("  {}: {}", "Name".yellow(), responder.name);
        println!("  {}: {}", "Description".yellow(), responder.description);
        println!("  {}: {}", "Socket".yellow(), responder.socket_path);
        println!("  {}: {}", "Methods".yellow(), responder.methods.join(", "));
        println!("  {}: {}", "Registered".yellow(), registered_at);
    }

    Ok(())
}

async fn cmd_version(client: &mut StaterServiceClient<Channel>, channel: &str) -> Result<()> {
    let request = InvokeMethodRequest {
        channel: channel.to_string(),
        method: "getPlatformVersion".to_string(),
        args: String::new(),
    };

    let response = client
        .invoke_method(request)
        .await
        .context("Failed to invoke getPlatformVersion")?
        .into_inner();

    match response.status() {
        CallStatus::Ok => {
            println!("{}", response.value.green());
            Ok(())
        }
        CallStatus::NotImplemented => {
            bail!("channel {} does not implement getPlatformVersion", channel)
        }
        CallStatus::Failed | CallStatus::Unspecified => {
            bail!("version query failed: {}", response.error)
        }
    }
}

async fn cmd_call(
    client: &mut StaterServiceClient<Channel>,
    channel: &str,
    method: &str,
    args: Option<&str>,
) -> Result<()> {
    // Validate the arguments before sending them on the wire
    if let Some(args) = args {
        serde_json::from_str::<serde_json::Value>(args).context("Arguments are not valid JSON")?;
    }

    let request = InvokeMethodRequest {
        channel: channel.to_string(),
        method: method.to_string(),
        args: args.unwrap_or("").to_string(),
    };

    let response = client
        .invoke_method(request)
        .await
        .context("Failed to invoke method")?
        .into_inner();

    match response.status() {
        CallStatus::Ok => {
            println!("{}", response.value.green());
            Ok(())
        }
        CallStatus::NotImplemented => {
            println!("{}: {}", "not implemented".yellow().bold(), method);
            Ok(())
        }
        CallStatus::Failed | CallStatus::Unspecified => {
            bail!("call failed: {}", response.error)
        }
    }
}
