use anyhow::Result;
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "Cattyscan 开发任务自动化")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 构建所有组件 (release)
    Build,
    /// 运行守护进程 (开发模式)
    Dev {
        /// 日志级别 (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "debug")]
        log_level: String,
    },
    /// 安装 systemd 服务
    Install,
    /// 卸载 systemd 服务
    Uninstall,
    /// 打包发布 (tar.gz)
    Dist,
    /// 运行测试
    Test,
    /// 清理构建产物
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // 确保在项目根目录执行
    let project_root = std::env::var("CARGO_MANIFEST_DIR")
        .map(std::path::PathBuf::from)
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::env::current_dir().unwrap());
    sh.change_dir(&project_root);

    match cli.command {
        Commands::Build => build(&sh)?,
        Commands::Dev { log_level } => dev(&sh, &log_level)?,
        Commands::Install => install(&sh)?,
        Commands::Uninstall => uninstall(&sh)?,
        Commands::Dist => dist(&sh)?,
        Commands::Test => test(&sh)?,
        Commands::Clean => clean(&sh)?,
    }

    Ok(())
}

fn build(sh: &Shell) -> Result<()> {
    println!("🔨 构建所有组件...");
    cmd!(
        sh,
        "cargo build --release -p cattyscan-daemon -p cattyscan-cli"
    )
    .run()?;
    println!("✅ 构建完成");
    Ok(())
}

fn dev(sh: &Shell, log_level: &str) -> Result<()> {
    println!("🚀 启动开发模式守护进程...");
    println!("   日志级别: {}", log_level);

    let rust_log = format!("{level},cattyscan_core={level}", level = log_level);
    cmd!(sh, "cargo run -p cattyscan-daemon")
        .env("RUST_LOG", rust_log)
        .run()?;
    Ok(())
}

fn install(sh: &Shell) -> Result<()> {
    println!("📦 安装 Cattyscan 服务...");

    // 构建
    build(sh)?;

    // 先停止已运行的服务（如果存在）
    println!("⏹️  停止现有服务...");
    let _ = cmd!(sh, "sudo systemctl stop cattyscan.service").run();

    // 等待进程完全退出
    std::thread::sleep(std::time::Duration::from_millis(500));

    // 复制二进制文件
    println!("📋 复制二进制文件...");
    cmd!(
        sh,
        "sudo cp target/release/cattyscan-daemon /usr/local/bin/"
    )
    .run()?;
    cmd!(
        sh,
        "sudo cp target/release/cattyscan-cli /usr/local/bin/cattyscan"
    )
    .run()?;

    // 复制 systemd 服务文件
    cmd!(sh, "sudo cp assets/cattyscan.service /etc/systemd/system/").run()?;

    // 启用并启动服务
    cmd!(sh, "sudo systemctl daemon-reload").run()?;
    cmd!(sh, "sudo systemctl enable --now cattyscan.service").run()?;

    println!("✅ 服务安装完成");
    println!("   使用 'cattyscan --help' 查看命令");
    println!("   使用 'systemctl status cattyscan' 查看服务状态");
    Ok(())
}

fn uninstall(sh: &Shell) -> Result<()> {
    println!("🗑️  卸载 Cattyscan 服务...");

    // 停止并禁用服务
    let _ = cmd!(sh, "sudo systemctl stop cattyscan.service").run();
    let _ = cmd!(sh, "sudo systemctl disable cattyscan.service").run();

    // 删除文件
    let _ = cmd!(sh, "sudo rm /etc/systemd/system/cattyscan.service").run();
    let _ = cmd!(sh, "sudo rm /usr/local/bin/cattyscan-daemon").run();
    let _ = cmd!(sh, "sudo rm /usr/local/bin/cattyscan").run();

    cmd!(sh, "sudo systemctl daemon-reload").run()?;

    println!("✅ 卸载完成");
    Ok(())
}

fn dist(sh: &Shell) -> Result<()> {
    println!("📦 打包发布...");

    build(sh)?;

    let version = "0.1.0";
    let dist_name = format!("cattyscan-{}-linux-x86_64", version);

    cmd!(sh, "mkdir -p dist/{dist_name}").run()?;
    cmd!(sh, "cp target/release/cattyscan-daemon dist/{dist_name}/").run()?;
    cmd!(
        sh,
        "cp target/release/cattyscan-cli dist/{dist_name}/cattyscan"
    )
    .run()?;
    cmd!(sh, "cp assets/cattyscan.service dist/{dist_name}/").run()?;

    sh.change_dir("dist");
    cmd!(sh, "tar -czvf {dist_name}.tar.gz {dist_name}").run()?;

    println!("✅ 打包完成: dist/{}.tar.gz", dist_name);
    Ok(())
}

fn test(sh: &Shell) -> Result<()> {
    println!("🧪 运行测试...");
    cmd!(sh, "cargo test --workspace").run()?;
    println!("✅ 测试完成");
    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("🧹 清理构建产物...");
    cmd!(sh, "cargo clean").run()?;
    cmd!(sh, "rm -rf dist").run()?;
    println!("✅ 清理完成");
    Ok(())
}
