// ==========================================
// 需求冲减引擎 - 冲减编排器
// ==========================================
// 状态机:
// INIT → PREPROCESS → [AGGREGATE_LIFT] → [NATIVE_NET] → FORECAST_NET | GRAPH_NET
//      → [MULTISTREAM_SPLIT] → COMBINE → RTF_NET → CLASSIFY → PROFILE → DONE
// 终止态:
// - EARLY_EXIT: 配置/结构校验失败 (返回 Err,不产生任何输出)
// - SKIP:       Skip 模式或展望期之后没有需要冲减的行
// 红线: 所有致命错误都在任何冲减状态变更之前抛出
// ==========================================

mod classify;
mod context;
mod passes;


use crate::config::{NettingConfig, ParameterSource};
use crate::domain::inputs::NettingInputs;
use crate::domain::output::{DemandTypeRow, NettingOutput};
use crate::domain::types::NettingStage;
use crate::engine::assembler::{assemble_demand_types, assemble_pegging};
use crate::engine::error::NettingResult;
use crate::engine::horizon::{skipped_forecast_rows, skipped_order_rows, HorizonSplitter};
use crate::engine::profiling::ProfilingRedistributor;
use crate::engine::stream::StreamManager;
use crate::importer::schema_binder::bind_inputs;
use crate::perf::PerfGuard;
use context::{build_context, PreprocessInput, TimeCalendar};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// 状态记录
// ==========================================
#[derive(Debug, Default)]
struct StageLog {
    stages: Vec<NettingStage>,
}

impl StageLog {
    fn enter(&mut self, stage: NettingStage) {
        debug!(stage = %stage, "状态转换");
        self.stages.push(stage);
    }

    fn into_stages(self) -> Vec<NettingStage> {
        self.stages
    }
}

// ==========================================
// NettingOrchestrator - 冲减编排器
// ==========================================
pub struct NettingOrchestrator {
    config: NettingConfig,
}

impl NettingOrchestrator {
    /// 创建编排器实例
    ///
    /// # 参数
    /// - config: 已解析的冲减配置
    pub fn new(config: NettingConfig) -> Self {
        Self { config }
    }

    /// 从扁平参数表创建（消耗顺序无效时报错）
    pub fn from_parameters<P: ParameterSource + ?Sized>(params: &P) -> NettingResult<Self> {
        Ok(Self::new(NettingConfig::from_parameters(params)?))
    }

    pub fn config(&self) -> &NettingConfig {
        &self.config
    }

    /// 执行一次完整冲减
    ///
    /// # 参数
    /// - inputs: 全部原始输入表
    ///
    /// # 返回
    /// - Ok: 需求类型表、pegging 表与经过的状态序列
    /// - Err: 配置/结构错误（EARLY_EXIT）
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub fn run(&self, inputs: &NettingInputs) -> NettingResult<NettingOutput> {
        let _perf = PerfGuard::new("netting_run");
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let config = &self.config;
        let mut stages = StageLog::default();
        stages.enter(NettingStage::Init);

        // ==========================================
        // INIT: 配置与结构校验
        // ==========================================
        let bound = match config.validate().and_then(|_| bind_inputs(inputs, config)) {
            Ok(bound) => bound,
            Err(e) => {
                stages.enter(NettingStage::EarlyExit);
                warn!(error = %e, "输入校验失败，提前退出");
                return Err(e);
            }
        };

        // ==========================================
        // PREPROCESS: 流描述、展望期拆分
        // ==========================================
        stages.enter(NettingStage::Preprocess);
        let cols = &config.columns;
        let calendar = TimeCalendar::from_telescopic(&inputs.telescopic, &cols.time, &cols.day);
        let streams = if config.use_mapping_graph {
            StreamManager::single_stream(config)
        } else {
            StreamManager::resolve(
                config,
                &bound.order_stream_params,
                &bound.forecast_stream_params,
                &bound.forecast_measures,
            )
        };

        let reference_date = bound.reference_bucket.as_deref().and_then(|b| calendar.date_of(b));
        if let (Some(bucket), None) = (&bound.reference_bucket, reference_date) {
            warn!(reference = %bucket, "参考日期无法解析为日期");
        }

        let splitter = HorizonSplitter::new(config, reference_date);
        let split = splitter.split(bound.orders, bound.forecasts, |t| calendar.date_of(t));
        let skipped_orders = skipped_order_rows(&split.skipped_orders);
        let skipped_forecasts = skipped_forecast_rows(&split.skipped_forecasts, &streams);

        if splitter.skip_all() || split.nothing_to_net() {
            stages.enter(NettingStage::Skip);
            info!(
                orders = split.skipped_orders.len(),
                forecasts = split.skipped_forecasts.len(),
                "没有需要冲减的行，直接输出"
            );
            return Ok(NettingOutput {
                run_id,
                order_demand_types: assemble_demand_types(skipped_orders),
                forecast_demand_types: assemble_demand_types(skipped_forecasts),
                pegging: Vec::new(),
                stages: stages.into_stages(),
            });
        }

        let (ctx, mut state) = build_context(
            config,
            inputs,
            streams,
            &calendar,
            PreprocessInput {
                orders: split.orders,
                forecasts: split.forecasts,
                supply: &bound.supply,
                association_edges: &bound.association_edges,
                reference_date,
            },
        );

        // ==========================================
        // 冲减轮次
        // ==========================================
        if ctx.lifter.is_some() {
            stages.enter(NettingStage::AggregateLift);
            if config.consume_native_first {
                stages.enter(NettingStage::NativeNet);
                passes::native_net(&ctx, &mut state);
            }
        }

        stages.enter(if ctx.graph.is_some() {
            NettingStage::GraphNet
        } else {
            NettingStage::ForecastNet
        });
        passes::forecast_net(&ctx, &mut state)?;

        let mut order_rows = Vec::new();
        if ctx.streams.is_multi_stream() {
            stages.enter(NettingStage::MultistreamSplit);
            order_rows.extend(classify::classify_past_orders(&ctx, &state));
        }

        stages.enter(NettingStage::Combine);
        passes::combine(&ctx, &mut state);

        stages.enter(NettingStage::RtfNet);
        passes::rtf_net(&ctx, &mut state)?;

        // ==========================================
        // CLASSIFY → PROFILE
        // ==========================================
        stages.enter(NettingStage::Classify);
        let classified = classify::classify(&ctx, &state);
        order_rows.extend(classified.orders);

        stages.enter(NettingStage::Profile);
        let profiler = ProfilingRedistributor::new(config, &inputs.telescopic, &inputs.basis);
        let (mut order_rows, mut forecast_rows): (Vec<DemandTypeRow>, Vec<DemandTypeRow>) = if profiler.is_enabled() {
            (
                profiler.profile_orders(order_rows),
                profiler.profile_forecasts(classified.forecasts),
            )
        } else {
            debug!("输出时间粒度与冲减粒度相同，不做画像");
            (
                order_rows.into_iter().map(|(row, _)| row).collect(),
                classified.forecasts,
            )
        };
        order_rows.extend(skipped_orders);
        forecast_rows.extend(skipped_forecasts);

        let output = NettingOutput {
            run_id,
            order_demand_types: assemble_demand_types(order_rows),
            forecast_demand_types: assemble_demand_types(forecast_rows),
            pegging: if config.pegging {
                assemble_pegging(state.pegging)
            } else {
                Vec::new()
            },
            stages: Vec::new(),
        };
        stages.enter(NettingStage::Done);

        info!(
            order_rows = output.order_demand_types.len(),
            forecast_rows = output.forecast_demand_types.len(),
            pegging_rows = output.pegging.len(),
            "冲减完成"
        );
        Ok(NettingOutput {
            stages: stages.into_stages(),
            ..output
        })
    }
}
