//! 条件检查器
//!
//! 对外入口。判定流水线按以下顺序短路执行，首个满足的阶段直接返回：
//!
//! 1. 描述为空 → 满足
//! 2. 单位换算，计算周长和总长度
//! 3. 描述含“不可发包裹”标记 → 逐条匹配全局规则
//! 4. 记录带产品 ID → 逐条匹配产品专属规则
//! 5. 解析描述并求值，解析出的条件结果即最终结果
//! 6. 解析失败或求值出错 → 兜底启发式匹配
//!
//! 任何阶段出错都判定为不满足。周长溢出在第 2 步即返回错误，判定为不满足，
//! 不进入兜底匹配；第 5 步的求值使用同一份已换算数据，因此不会再因溢出失败。

use crate::error::Result;
use crate::evaluator::ConditionEvaluator;
use crate::fallback::fallback_check;
use crate::keywords;
use crate::measurement::{DerivedMeasurement, Measurement, NormalizedMeasurement, ShipmentData};
use crate::models::{CheckOutcome, ConditionKind, ConfigRule, DecisionStage, RuleSet};
use crate::parser::ConditionParser;
use crate::units::{UnitConverter, UnitDefaults};
use freight_shared::config::AppConfig;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// 注册条件检查指标的描述信息
///
/// 需在安装 metrics recorder 之后调用，未安装时为空操作。
pub fn describe_metrics() {
    metrics::describe_counter!(
        "condition_checks_total",
        "Total number of shipment condition checks"
    );
    metrics::describe_histogram!(
        "condition_check_duration_seconds",
        "Shipment condition check duration in seconds"
    );
}

/// 判定追踪，仅在启用时收集
struct Trace {
    enabled: bool,
    lines: Vec<String>,
}

impl Trace {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            lines: Vec::new(),
        }
    }

    fn push(&mut self, line: impl FnOnce() -> String) {
        if self.enabled {
            self.lines.push(line());
        }
    }
}

/// 流水线结论
struct Decision {
    matched: bool,
    stage: DecisionStage,
    matched_rule: Option<String>,
    condition_kind: Option<ConditionKind>,
}

impl Decision {
    fn rule(stage: DecisionStage, rule: &ConfigRule) -> Self {
        Self {
            matched: true,
            stage,
            matched_rule: Some(rule.description.clone()),
            condition_kind: Some(rule.condition_type),
        }
    }
}

/// 条件检查器
///
/// 规则集在构造时注入，检查器本身无可变状态，可在多线程间共享。
#[derive(Clone)]
pub struct ConditionChecker {
    rules: Arc<RuleSet>,
    parser: Arc<ConditionParser>,
    unit_defaults: UnitDefaults,
    trace_enabled: bool,
}

impl ConditionChecker {
    pub fn new(rules: Arc<RuleSet>) -> Result<Self> {
        Ok(Self {
            rules,
            parser: Arc::new(ConditionParser::new()?),
            unit_defaults: UnitDefaults::default(),
            trace_enabled: false,
        })
    }

    /// 按应用配置设置默认单位和追踪开关
    pub fn from_config(config: &AppConfig, rules: Arc<RuleSet>) -> Result<Self> {
        let mut checker =
            Self::new(rules)?.with_unit_defaults(UnitDefaults::from_config(&config.units)?);
        checker.trace_enabled = config.rules.trace_enabled;
        Ok(checker)
    }

    pub fn with_parser(mut self, parser: ConditionParser) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn with_unit_defaults(mut self, defaults: UnitDefaults) -> Self {
        self.unit_defaults = defaults;
        self
    }

    /// 启用判定追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 使用新的规则集快照，其余设置不变
    pub fn with_rules(&self, rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            ..self.clone()
        }
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// 判断包裹是否满足描述的条件
    pub fn check_condition(&self, description: &str, data: &ShipmentData) -> bool {
        self.check(description, data).matched
    }

    /// 判断包裹是否满足描述的条件，并返回判定阶段和追踪信息
    pub fn check(&self, description: &str, data: &ShipmentData) -> CheckOutcome {
        self.run(description, |defaults| {
            Measurement::from_shipment(data, defaults)
        })
    }

    /// 对已提取的计量记录执行判定
    pub fn check_measurement(&self, description: &str, measurement: &Measurement) -> CheckOutcome {
        self.run(description, |_| Ok(measurement.clone()))
    }

    fn run<F>(&self, description: &str, extract: F) -> CheckOutcome
    where
        F: FnOnce(&UnitDefaults) -> Result<Measurement>,
    {
        let start = Instant::now();
        let mut trace = Trace::new(self.trace_enabled);

        let decision = if description.trim().is_empty() {
            trace.push(|| "描述为空，视为满足".to_string());
            Decision {
                matched: true,
                stage: DecisionStage::EmptyDescription,
                matched_rule: None,
                condition_kind: None,
            }
        } else {
            let result = extract(&self.unit_defaults)
                .and_then(|m| self.evaluate_pipeline(description, &m, &mut trace));

            match result {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(error = %e, description, "条件检查失败，视为不满足");
                    trace.push(|| format!("检查失败: {}", e));
                    Decision {
                        matched: false,
                        stage: DecisionStage::Failed,
                        matched_rule: None,
                        condition_kind: None,
                    }
                }
            }
        };

        metrics::counter!(
            "condition_checks_total",
            "stage" => decision.stage.as_str(),
            "matched" => if decision.matched { "true" } else { "false" }
        )
        .increment(1);

        let elapsed = start.elapsed();
        metrics::histogram!(
            "condition_check_duration_seconds",
            "stage" => decision.stage.as_str()
        )
        .record(elapsed.as_secs_f64());

        debug!(
            description,
            matched = decision.matched,
            stage = %decision.stage,
            "条件检查完成"
        );

        let mut outcome = CheckOutcome::new(decision.stage);
        outcome.matched = decision.matched;
        outcome.matched_rule = decision.matched_rule;
        outcome.condition_kind = decision.condition_kind;
        outcome.evaluation_trace = trace.lines;
        outcome.evaluation_time_ms = elapsed.as_millis() as i64;
        outcome
    }

    fn evaluate_pipeline(
        &self,
        description: &str,
        measurement: &Measurement,
        trace: &mut Trace,
    ) -> Result<Decision> {
        let data = UnitConverter::normalize(measurement);
        trace_conversion(trace, measurement, &data);

        let derived = DerivedMeasurement::compute(&data)?;
        trace.push(|| {
            format!(
                "周长 = 2 × ({} + {}) = {}, 总长度 = {}",
                data.width.normalize(),
                data.height.normalize(),
                derived.girth.normalize(),
                derived.total_length.normalize()
            )
        });

        let compact = keywords::compact(description);

        if keywords::contains_any(&self.parser.keywords().unauthorized, &compact) {
            let rules = self.rules.unauthorized_conditions();
            trace.push(|| format!("不可发包裹描述，匹配 {} 条全局规则", rules.len()));
            if let Some(rule) = first_match(rules, &data, &derived, trace) {
                return Ok(Decision::rule(DecisionStage::UnauthorizedRule, rule));
            }
        }

        if let Some(product_id) = data.product_id.as_deref() {
            let rules = self.rules.product_conditions(Some(product_id));
            trace.push(|| format!("产品 {} 有 {} 条专属规则", product_id, rules.len()));
            if let Some(rule) = first_match(rules, &data, &derived, trace) {
                return Ok(Decision::rule(DecisionStage::ProductRule, rule));
            }
        }

        if let Some(condition) = self.parser.parse(description) {
            let kind = condition.kind();
            match ConditionEvaluator::evaluate(&condition, &data) {
                Ok(matched) => {
                    trace.push(|| {
                        format!(
                            "解析为 {} 条件 {:?} => {}",
                            kind,
                            condition.params,
                            if matched { "MATCHED" } else { "NOT_MATCHED" }
                        )
                    });
                    return Ok(Decision {
                        matched,
                        stage: DecisionStage::ParsedCondition,
                        matched_rule: None,
                        condition_kind: Some(kind),
                    });
                }
                // 派生尺寸已在第 2 步算出，这里只处理求值器自身的错误
                Err(e) => {
                    warn!(error = %e, description, "解析条件求值失败，改用兜底匹配");
                    trace.push(|| format!("{} 条件求值失败: {}", kind, e));
                }
            }
        } else {
            trace.push(|| "无法解析描述，改用兜底匹配".to_string());
        }

        let verdict = fallback_check(
            &self.parser,
            description,
            &data,
            &derived,
            &self.rules.thresholds,
        );
        trace.push(|| {
            format!(
                "兜底匹配 {} => {}",
                verdict.detail,
                if verdict.matched { "MATCHED" } else { "NOT_MATCHED" }
            )
        });

        Ok(Decision {
            matched: verdict.matched,
            stage: DecisionStage::Fallback,
            matched_rule: None,
            condition_kind: verdict.kind,
        })
    }
}

fn trace_conversion(trace: &mut Trace, raw: &Measurement, data: &NormalizedMeasurement) {
    trace.push(|| {
        format!(
            "重量换算: {} {} -> {} LB",
            raw.weight.normalize(),
            raw.weight_unit,
            data.weight.normalize()
        )
    });
    trace.push(|| {
        format!(
            "尺寸换算: {}x{}x{} {} -> {}x{}x{} IN",
            raw.length.normalize(),
            raw.width.normalize(),
            raw.height.normalize(),
            raw.dimension_unit,
            data.length.normalize(),
            data.width.normalize(),
            data.height.normalize()
        )
    });
}

/// 按顺序返回第一条匹配的配置规则
fn first_match<'a>(
    rules: &'a [ConfigRule],
    data: &NormalizedMeasurement,
    derived: &DerivedMeasurement,
    trace: &mut Trace,
) -> Option<&'a ConfigRule> {
    rules.iter().find(|rule| {
        let matched = rule.matches(data, derived);
        trace.push(|| {
            format!(
                "规则 [{}] {} {} {} => {}",
                rule.description,
                rule.condition_type,
                rule.operator,
                rule.value.normalize(),
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            )
        });
        matched
    })
}
