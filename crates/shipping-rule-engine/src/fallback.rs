//! 兜底匹配
//!
//! 解析失败或求值出错时，直接在原始描述上用关键词和数字做启发式判断，
//! 缺少数字时使用规则文档中的默认阈值。

use crate::keywords;
use crate::measurement::{DerivedMeasurement, NormalizedMeasurement};
use crate::models::{ConditionKind, Thresholds};
use crate::operators::Comparison;
use crate::parser::ConditionParser;

/// 兜底判断结果
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackVerdict {
    pub matched: bool,
    pub kind: Option<ConditionKind>,
    pub detail: String,
}

impl FallbackVerdict {
    fn unmatched(detail: impl Into<String>) -> Self {
        Self {
            matched: false,
            kind: None,
            detail: detail.into(),
        }
    }
}

/// 对原始描述做启发式判断
///
/// 度量选择顺序为 长度+周长 → 最长边（不含周长）→ 重量；
/// 比较方向按 大于 → 小于 → 介于 的顺序首个命中，未出现比较词时按大于处理。
pub fn fallback_check(
    parser: &ConditionParser,
    text: &str,
    data: &NormalizedMeasurement,
    derived: &DerivedMeasurement,
    thresholds: &Thresholds,
) -> FallbackVerdict {
    let kw = parser.keywords();
    let compact = keywords::compact(text);

    let (kind, value) = if keywords::contains_any(&kw.length_girth, &compact) {
        (ConditionKind::LengthGirth, derived.total_length)
    } else if keywords::contains_any(&kw.length, &compact)
        && !keywords::contains_any(&kw.girth, &compact)
    {
        (ConditionKind::Length, data.length)
    } else if keywords::contains_any(&kw.weight, &compact) {
        (ConditionKind::Weight, data.weight)
    } else {
        return FallbackVerdict::unmatched("无可识别的度量关键词");
    };

    let Some(default_threshold) = thresholds.get(kind) else {
        return FallbackVerdict::unmatched(format!("{} 没有默认阈值", kind));
    };
    let numbers = parser.extract_numbers(text);
    let threshold = match numbers.first() {
        Some(Some(n)) => *n,
        Some(None) => return FallbackVerdict::unmatched("阈值数字无法解析"),
        None => default_threshold,
    };

    let comparison = parser
        .infer_comparison(&compact)
        .unwrap_or(Comparison::Greater);

    let (matched, detail) = match comparison {
        Comparison::Greater => (
            value > threshold,
            format!("{} > {}", value.normalize(), threshold.normalize()),
        ),
        Comparison::Less => (
            value < threshold,
            format!("{} < {}", value.normalize(), threshold.normalize()),
        ),
        Comparison::Between => match numbers.as_slice() {
            [Some(min), Some(max), ..] => (
                value > *min && value < *max,
                format!("{} < {} < {}", min, value.normalize(), max),
            ),
            _ => (false, "between 缺少上下限".to_string()),
        },
    };

    FallbackVerdict {
        matched,
        kind: Some(kind),
        detail: format!("{}: {}", kind, detail),
    }
}
