mod commands;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use machineflow_driver::{FlagValue, MachineStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "machineflow")]
#[command(about = "OVH Public Cloud にDockerホストを作成・管理する", long_about = None)]
struct Cli {
    /// マシン情報の保存先 (デフォルト: ~/.machineflow)
    #[arg(long, env = "MACHINEFLOW_STORAGE_PATH", global = true)]
    storage_path: Option<PathBuf>,

    /// デバッグログを出力
    #[arg(short = 'D', long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// マシンを作成
    Create {
        /// マシン名
        name: String,
        #[command(flatten)]
        ovh: OvhArgs,
    },
    /// マシンの状態を表示
    Status {
        /// マシン名
        name: String,
    },
    /// DockerデーモンのURLを表示
    Url {
        /// マシン名
        name: String,
    },
    /// マシンのIPアドレスを表示
    Ip {
        /// マシン名
        name: String,
    },
    /// SSH秘密鍵のパスを表示
    #[command(name = "ssh-key-path")]
    SshKeyPath {
        /// マシン名
        name: String,
    },
    /// マシンを再起動
    Restart {
        /// マシン名
        name: String,
    },
    /// マシンを起動
    Start {
        /// マシン名
        name: String,
    },
    /// マシンを停止
    Stop {
        /// マシン名
        name: String,
    },
    /// マシンを強制停止
    Kill {
        /// マシン名
        name: String,
    },
    /// マシンを削除
    Rm {
        /// マシン名
        name: String,
        /// リモートの削除に失敗してもローカルの記録を削除する
        #[arg(short, long)]
        force: bool,
    },
    /// マシンの一覧を表示
    Ls,
    /// ドライバーのオプション一覧を表示
    Flags,
    /// バージョン情報を表示
    Version,
}

/// OVH driver options; absent values fall back to the environment and
/// then to the driver defaults
#[derive(Args, Debug, Default)]
struct OvhArgs {
    /// OVH API application key
    #[arg(long = "ovh-application-key")]
    application_key: Option<String>,
    /// OVH API application secret
    #[arg(long = "ovh-application-secret")]
    application_secret: Option<String>,
    /// OVH API consumer key
    #[arg(long = "ovh-consumer-key")]
    consumer_key: Option<String>,
    /// OVH Cloud API endpoint (ovh-eu, ovh-ca, ...)
    #[arg(long = "ovh-endpoint")]
    endpoint: Option<String>,
    /// OVH Cloud project name or id
    #[arg(long = "ovh-project")]
    project: Option<String>,
    /// OVH Cloud region name
    #[arg(long = "ovh-region")]
    region: Option<String>,
    /// OVH Cloud flavor name or id
    #[arg(long = "ovh-flavor")]
    flavor: Option<String>,
    /// OVH Cloud image name or id
    #[arg(long = "ovh-image")]
    image: Option<String>,
    /// OVH Cloud private network name or vlan number
    #[arg(long = "ovh-private-network")]
    private_network: Option<String>,
    /// OVH Cloud ssh key name or id
    #[arg(long = "ovh-ssh-key")]
    ssh_key: Option<String>,
    /// SSH username
    #[arg(long = "ovh-ssh-user")]
    ssh_user: Option<String>,
    /// Billing period (hourly or monthly)
    #[arg(long = "ovh-billing-period")]
    billing_period: Option<String>,
}

impl OvhArgs {
    /// Values given on the command line, keyed by option name
    fn explicit(self) -> Vec<(&'static str, FlagValue)> {
        [
            ("ovh-application-key", self.application_key),
            ("ovh-application-secret", self.application_secret),
            ("ovh-consumer-key", self.consumer_key),
            ("ovh-endpoint", self.endpoint),
            ("ovh-project", self.project),
            ("ovh-region", self.region),
            ("ovh-flavor", self.flavor),
            ("ovh-image", self.image),
            ("ovh-private-network", self.private_network),
            ("ovh-ssh-key", self.ssh_key),
            ("ovh-ssh-user", self.ssh_user),
            ("ovh-billing-period", self.billing_period),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, FlagValue::String(v))))
        .collect()
    }
}

fn storage_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("ホームディレクトリが見つかりません"))?;
    Ok(home.join(".machineflow"))
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    // ストア不要のコマンド
    match cli.command {
        Commands::Version => {
            println!("machineflow {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Flags => {
            commands::flags::handle();
            return Ok(());
        }
        _ => {}
    }

    let store = MachineStore::new(storage_path(cli.storage_path)?);
    tracing::debug!("Using storage path {}", store.root().display());

    let result = match cli.command {
        Commands::Create { name, ovh } => {
            commands::create::handle(&store, &name, ovh.explicit()).await
        }
        Commands::Status { name } => commands::inspect::status(&store, &name).await,
        Commands::Url { name } => commands::inspect::url(&store, &name).await,
        Commands::Ip { name } => commands::inspect::ip(&store, &name).await,
        Commands::SshKeyPath { name } => commands::inspect::ssh_key_path(&store, &name).await,
        Commands::Restart { name } => {
            commands::power::handle(&store, &name, commands::power::Action::Restart).await
        }
        Commands::Start { name } => {
            commands::power::handle(&store, &name, commands::power::Action::Start).await
        }
        Commands::Stop { name } => {
            commands::power::handle(&store, &name, commands::power::Action::Stop).await
        }
        Commands::Kill { name } => {
            commands::power::handle(&store, &name, commands::power::Action::Kill).await
        }
        Commands::Rm { name, force } => commands::rm::handle(&store, &name, force).await,
        Commands::Ls => commands::ls::handle(&store).await,
        Commands::Version | Commands::Flags => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
