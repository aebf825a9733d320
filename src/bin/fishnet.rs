/*
 * @Author       : 老董
 * @Date         : 2024-03-20
 * @Description  : 命令行程序：按任务文件训练网络，或用已保存的网络对数据集的测试集分类
 */

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand, ValueHint};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use fishnet::data::ImageSetLoader;
use fishnet::job::{JobFile, JobRunner};
use fishnet::nn::Network;

type DynError = Box<dyn Error>;

type Result<T> = std::result::Result<T, DynError>;

#[derive(Parser)]
#[command(author, version, about = "FishNet：前馈神经网络的训练与测试")]
struct Cli {
    /// 日志文件目录，不指定则只输出到终端
    #[arg(long, global = true, env = "FISHNET_LOG_DIR", value_hint = ValueHint::DirPath)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 校验并依次执行任务文件中的训练任务
    Train(TrainArgs),

    /// 用已保存的网络对数据集的测试集分类
    Test(TestArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// 一个或多个JSON任务文件
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    job_files: Vec<PathBuf>,

    /// 工作线程数
    #[arg(long, default_value_t = default_threads())]
    threads: usize,

    /// 只校验任务文件，不训练
    #[arg(long)]
    dry_run: bool,

    /// 数据根目录
    #[arg(long, env = "FISHNET_DATA_DIR", default_value = "./data", value_hint = ValueHint::DirPath)]
    data_dir: PathBuf,

    /// 统计表与检查点的保存目录
    #[arg(long, env = "FISHNET_SAVE_DIR", default_value = ".", value_hint = ValueHint::DirPath)]
    save_dir: PathBuf,
}

#[derive(Args)]
struct TestArgs {
    /// 网络文件（.fish）
    #[arg(value_hint = ValueHint::FilePath)]
    network_file: PathBuf,

    /// 数据集名
    #[arg(long)]
    dataset: String,

    /// 工作线程数
    #[arg(long, default_value_t = default_threads())]
    threads: usize,

    /// 人脸图像的缩小倍数（1、2或4），其余数据集忽略
    #[arg(long, default_value_t = ImageSetLoader::DEFAULT_FACE_SCALE)]
    face_image_size: usize,

    /// 数据根目录
    #[arg(long, env = "FISHNET_DATA_DIR", default_value = "./data", value_hint = ValueHint::DirPath)]
    data_dir: PathBuf,

    /// 把测试报告（网络结构、权重统计、混淆矩阵）写入该CSV文件
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.log_dir.as_deref()) {
        eprintln!("无法初始化日志: {err}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Train(args) => run_train(args),
        Command::Test(args) => run_test(args),
    };
    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }
}

/// 终端日志级别默认为info，可用`RUST_LOG`覆盖；指定了日志目录时同时写入文件
fn init_tracing(log_dir: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal());

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let seconds = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs());
            let file = File::create(dir.join(format!("fishnet_{seconds}.log")))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    let mut job_files = Vec::with_capacity(args.job_files.len());
    for path in &args.job_files {
        let job_file = JobFile::from_path(path)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        job_file
            .validate()
            .map_err(|e| format!("{}: {e}", path.display()))?;
        job_files.push(job_file);
    }
    let job_count: usize = job_files.iter().map(|f| f.jobs.len()).sum();
    info!("已校验{}个任务文件，共{job_count}个任务", job_files.len());
    if args.dry_run {
        return Ok(());
    }

    let mut runner = JobRunner::new(args.data_dir, args.save_dir, args.threads);
    for job_file in &job_files {
        runner.run_all(job_file)?;
    }
    Ok(())
}

fn run_test(args: TestArgs) -> Result<()> {
    let mut network = Network::load(&args.network_file)?;
    network.set_thread_count(args.threads)?;
    let mut loader = ImageSetLoader::new(args.data_dir);
    let image_set = loader.load_scaled(&args.dataset, args.face_image_size)?;
    network.validate_output_layer(image_set.category_count())?;
    info!("用{}对{}的测试集分类:\n{}", network.name(), image_set.name, network.description());

    let predictions = network.classify(&image_set.test)?;
    let correct = match &args.output {
        Some(output) => {
            let mut writer = BufWriter::new(File::create(output)?);
            let correct = network.write_test_report(&image_set, &predictions, &mut writer)?;
            writer.flush()?;
            info!("测试报告已写入{}", output.display());
            correct
        }
        None => image_set
            .test
            .iter()
            .zip(&predictions)
            .filter(|(image, predicted)| image.category == **predicted)
            .count(),
    };
    info!(
        "正确{correct}/{}（{:.2}%）",
        image_set.test.len(),
        100.0 * correct as f64 / image_set.test.len() as f64
    );
    Ok(())
}
