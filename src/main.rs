// ==========================================
// 需求冲减引擎 - 命令行入口
// ==========================================
// 用法:
//   demand-netting <input_dir> [output_dir]
// 输出目录缺省为 <input_dir>/output
// ==========================================

use anyhow::{bail, Context};
use demand_netting::{logging, InputLoader, NettingConfig, NettingOrchestrator, OutputWriter};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let Some(input_dir) = args.next().map(PathBuf::from) else {
        bail!("用法: demand-netting <input_dir> [output_dir]");
    };
    let output_dir = args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| input_dir.join("output"));

    tracing::info!("==================================================");
    tracing::info!("{} {}", demand_netting::APP_NAME, demand_netting::VERSION);
    tracing::info!("==================================================");

    let inputs = InputLoader::new()
        .load_dir(&input_dir)
        .with_context(|| format!("读取输入目录失败: {}", input_dir.display()))?;

    let config = NettingConfig::from_parameters(&inputs.parameters).context("参数解析失败")?;
    let orchestrator = NettingOrchestrator::new(config);
    let output = orchestrator.run(&inputs).context("冲减失败")?;

    OutputWriter::new(&orchestrator.config().columns)
        .write_dir(&output_dir, &output)
        .with_context(|| format!("写出结果失败: {}", output_dir.display()))?;

    println!("run_id={}", output.run_id);
    Ok(())
}
