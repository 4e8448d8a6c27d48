//! 规则描述解析器
//!
//! 将自由文本的规则描述按固定顺序分类为条件类型，并抽取数值与布尔参数。
//! 分类按 `CLASSIFICATION_ORDER` 依次尝试，首个命中者生效；
//! 都未命中时依次尝试特殊短语、尺寸/体积重、日期区间。

use crate::error::Result;
use crate::keywords::{self, KeywordSet};
use crate::models::{
    Condition, ConditionParams, DateRange, DimensionSelector, NumericRange, SpecialType,
};
use crate::operators::Comparison;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

const NUMBER_PATTERN: &str = r"\d+(\.\d+)?";

/// 用于识别“描述中含日期”的模式
const DATE_DETECTORS: [&str; 3] = [
    r"\d{4}-\d{1,2}-\d{1,2}",
    r"\d{1,2}/\d{1,2}/\d{4}",
    r"\d{4}年\d{1,2}月\d{1,2}日",
];

/// 日期抽取：年在前（- / . 年月日分隔）或美式 MM/DD/YYYY
const DATE_EXTRACTOR: &str = r"(?P<y>\d{4})[-/.年](?P<m>\d{1,2})[-/.月](?P<d>\d{1,2})日?|(?P<us_m>\d{1,2})/(?P<us_d>\d{1,2})/(?P<us_y>\d{4})";

/// 关键词分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    LengthGirth,
    Length,
    Weight,
    Residential,
    Remote,
    Date,
}

const CLASSIFICATION_ORDER: [Classification; 6] = [
    Classification::LengthGirth,
    Classification::Length,
    Classification::Weight,
    Classification::Residential,
    Classification::Remote,
    Classification::Date,
];

/// 条件解析器
#[derive(Debug, Clone)]
pub struct ConditionParser {
    keywords: KeywordSet,
    number_re: Regex,
    date_detectors: Vec<Regex>,
    date_extractor: Regex,
}

impl ConditionParser {
    /// 使用内置中英文关键词表创建
    pub fn new() -> Result<Self> {
        Self::with_keywords(KeywordSet::default())
    }

    pub fn with_keywords(keywords: KeywordSet) -> Result<Self> {
        let date_detectors = DATE_DETECTORS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            keywords,
            number_re: Regex::new(NUMBER_PATTERN)?,
            date_detectors,
            date_extractor: Regex::new(DATE_EXTRACTOR)?,
        })
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// 解析规则描述，无法识别时返回 None
    pub fn parse(&self, text: &str) -> Option<Condition> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let compact = keywords::compact(text);

        if let Some(class) = CLASSIFICATION_ORDER
            .iter()
            .copied()
            .find(|c| self.classifies(*c, text, &compact))
        {
            debug!(?class, text, "规则描述已分类");
            return self.build(class, text, &compact);
        }

        self.parse_special(text, &compact)
            .or_else(|| self.parse_dimension(text, &compact))
            .or_else(|| self.parse_date_range(text))
    }

    fn classifies(&self, class: Classification, text: &str, compact: &str) -> bool {
        let kw = &self.keywords;
        match class {
            Classification::LengthGirth => keywords::contains_any(&kw.length_girth, compact),
            Classification::Length => {
                keywords::contains_any(&kw.length, compact)
                    && !keywords::contains_any(&kw.girth, compact)
            }
            Classification::Weight => keywords::contains_any(&kw.weight, compact),
            Classification::Residential => keywords::contains_any(&kw.residential, compact),
            Classification::Remote => keywords::contains_any(&kw.remote, compact),
            Classification::Date => self.date_detectors.iter().any(|re| re.is_match(text)),
        }
    }

    fn build(&self, class: Classification, text: &str, compact: &str) -> Option<Condition> {
        let kw = &self.keywords;
        let params = match class {
            Classification::LengthGirth => {
                ConditionParams::LengthGirth(self.infer_range(text, compact))
            }
            Classification::Length => ConditionParams::Length {
                range: self.infer_range(text, compact),
                dimension: if keywords::contains_any(&kw.second_longest, compact) {
                    DimensionSelector::SecondLongest
                } else {
                    DimensionSelector::Longest
                },
            },
            Classification::Weight => ConditionParams::Weight(self.infer_range(text, compact)),
            Classification::Residential => ConditionParams::Residential {
                expected: Some(!keywords::contains_any(&kw.non_residential, compact)),
            },
            Classification::Remote => ConditionParams::Remote {
                min_level: Some(if keywords::contains_any(&kw.extended_remote, compact) {
                    2
                } else {
                    1
                }),
            },
            Classification::Date => return self.parse_date_range(text),
        };

        Some(Condition::new(params, text))
    }

    /// 固定短语表
    fn parse_special(&self, text: &str, compact: &str) -> Option<Condition> {
        let kw = &self.keywords;

        let params = if keywords::contains_any(&kw.home_delivery, compact) {
            ConditionParams::Residential {
                expected: Some(true),
            }
        } else if keywords::contains_any(&kw.signature, compact) {
            ConditionParams::Unknown {
                special: Some(SpecialType::Signature),
                date_range: None,
            }
        } else if keywords::contains_any(&kw.address_correction, compact) {
            ConditionParams::Unknown {
                special: Some(SpecialType::AddressCorrection),
                date_range: None,
            }
        } else if keywords::contains_any(&kw.second_longest, compact) {
            ConditionParams::Length {
                range: self.infer_range(text, compact),
                dimension: DimensionSelector::SecondLongest,
            }
        } else {
            return None;
        };

        Some(Condition::new(params, text))
    }

    /// 尺寸 / 体积重描述
    fn parse_dimension(&self, text: &str, compact: &str) -> Option<Condition> {
        let kw = &self.keywords;

        let params = if keywords::contains_any(&kw.volumetric, compact) {
            ConditionParams::Unknown {
                special: Some(SpecialType::VolumetricWeight),
                date_range: None,
            }
        } else if keywords::contains_any(&kw.size, compact) {
            ConditionParams::Length {
                range: self.infer_range(text, compact),
                dimension: DimensionSelector::Longest,
            }
        } else {
            return None;
        };

        Some(Condition::new(params, text))
    }

    /// 日期区间，结果为 Unknown 类型，求值恒为 false
    fn parse_date_range(&self, text: &str) -> Option<Condition> {
        let mut dates: Vec<NaiveDate> = self
            .date_extractor
            .captures_iter(text)
            .filter_map(|caps| {
                let (y, m, d) = match (caps.name("y"), caps.name("m"), caps.name("d")) {
                    (Some(y), Some(m), Some(d)) => (y, m, d),
                    _ => (caps.name("us_y")?, caps.name("us_m")?, caps.name("us_d")?),
                };
                NaiveDate::from_ymd_opt(
                    y.as_str().parse().ok()?,
                    m.as_str().parse().ok()?,
                    d.as_str().parse().ok()?,
                )
            })
            .take(2)
            .collect();

        dates.sort();
        let start = *dates.first()?;

        Some(Condition::new(
            ConditionParams::Unknown {
                special: Some(SpecialType::DateRange),
                date_range: Some(DateRange {
                    start,
                    end: dates.get(1).copied(),
                }),
            },
            text,
        ))
    }

    /// 按从左到右的顺序抽取所有数字
    ///
    /// 全角数字折算为半角；无法表示为 Decimal 的数字（溢出或其他书写系统的数字）
    /// 保留位置并记为 None，后续数字不前移。
    pub fn extract_numbers(&self, text: &str) -> Vec<Option<Decimal>> {
        self.number_re
            .find_iter(text)
            .map(|m| {
                let number = Decimal::from_str(&fold_fullwidth_digits(m.as_str())).ok();
                if number.is_none() {
                    warn!(number = m.as_str(), text, "数字无法解析，视为未设置");
                }
                number
            })
            .collect()
    }

    /// 推断比较方向，顺序为 大于 → 小于 → 介于，首个命中者生效
    pub fn infer_comparison(&self, compact: &str) -> Option<Comparison> {
        let kw = &self.keywords;
        if keywords::contains_any(&kw.greater, compact) {
            Some(Comparison::Greater)
        } else if keywords::contains_any(&kw.less, compact) {
            Some(Comparison::Less)
        } else if keywords::contains_any(&kw.between, compact) {
            Some(Comparison::Between)
        } else {
            None
        }
    }

    /// 由比较方向和数字构造区间；缺少所需数字时返回无边界区间
    fn infer_range(&self, text: &str, compact: &str) -> NumericRange {
        let numbers = self.extract_numbers(text);

        match (self.infer_comparison(compact), numbers.as_slice()) {
            (Some(Comparison::Greater), [Some(first), ..]) => NumericRange::greater_than(*first),
            (Some(Comparison::Less), [Some(first), ..]) => NumericRange::less_than(*first),
            (Some(Comparison::Between), [Some(first), Some(second), ..]) => {
                NumericRange::between(*first, *second)
            }
            _ => NumericRange::unconstrained(),
        }
    }
}

/// 全角数字 `０`-`９` 折算为 ASCII
fn fold_fullwidth_digits(number: &str) -> String {
    number
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConditionKind;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn parser() -> ConditionParser {
        ConditionParser::new().unwrap()
    }

    fn range_of(cond: &Condition) -> NumericRange {
        *cond.range().expect("numeric condition")
    }

    #[test]
    fn test_length_girth() {
        let cond = parser().parse("length+girth > 165").unwrap();
        assert_eq!(cond.kind(), ConditionKind::LengthGirth);
        assert_eq!(range_of(&cond), NumericRange::greater_than(dec("165")));

        let cond = parser().parse("长度+周长超过130英寸").unwrap();
        assert_eq!(cond.kind(), ConditionKind::LengthGirth);
        assert_eq!(range_of(&cond).min, Some(dec("130")));
    }

    #[test]
    fn test_length_excludes_girth() {
        let cond = parser().parse("longest side over 108 in").unwrap();
        assert_eq!(cond.kind(), ConditionKind::Length);
        assert_eq!(range_of(&cond).min, Some(dec("108")));

        // 含 girth 但不是 length+girth 组合，不归为 Length
        let cond = parser().parse("length and girth over 130 lb");
        assert_eq!(cond.map(|c| c.kind()), Some(ConditionKind::Weight));
    }

    #[test]
    fn test_weight_chinese() {
        let cond = parser().parse("重量大于100磅").unwrap();
        assert_eq!(cond.kind(), ConditionKind::Weight);
        assert_eq!(range_of(&cond), NumericRange::greater_than(dec("100")));
    }

    #[test]
    fn test_less_than() {
        let cond = parser().parse("weight under 20.5 lb").unwrap();
        assert_eq!(range_of(&cond), NumericRange::less_than(dec("20.5")));

        let cond = parser().parse("重量低于5公斤").unwrap();
        assert_eq!(range_of(&cond).max, Some(dec("5")));
    }

    #[test]
    fn test_between() {
        let cond = parser().parse("weight between 100 and 200 lb").unwrap();
        assert_eq!(
            range_of(&cond),
            NumericRange::between(dec("100"), dec("200"))
        );

        let cond = parser().parse("重量在100到200磅之间").unwrap();
        assert_eq!(
            range_of(&cond),
            NumericRange::between(dec("100"), dec("200"))
        );
    }

    #[test]
    fn test_between_with_single_number_is_unconstrained() {
        let cond = parser().parse("weight between 100 lb").unwrap();
        assert!(range_of(&cond).is_unconstrained());
    }

    #[test]
    fn test_greater_wins_over_between() {
        let cond = parser().parse("weight > 50 between 100 and 200").unwrap();
        assert_eq!(range_of(&cond), NumericRange::greater_than(dec("50")));
    }

    #[test]
    fn test_parser_never_sets_inclusivity() {
        let cond = parser().parse("length+girth between 100 and 200").unwrap();
        let range = range_of(&cond);
        assert!(!range.min_inclusive);
        assert!(!range.max_inclusive);
    }

    #[test]
    fn test_residential() {
        let cond = parser().parse("Residential delivery surcharge").unwrap();
        assert_eq!(
            cond.params,
            ConditionParams::Residential {
                expected: Some(true)
            }
        );

        let cond = parser().parse("非住宅地址").unwrap();
        assert_eq!(
            cond.params,
            ConditionParams::Residential {
                expected: Some(false)
            }
        );

        let cond = parser().parse("non-residential").unwrap();
        assert_eq!(
            cond.params,
            ConditionParams::Residential {
                expected: Some(false)
            }
        );
    }

    #[test]
    fn test_remote_levels() {
        let cond = parser().parse("remote area surcharge").unwrap();
        assert_eq!(cond.params, ConditionParams::Remote { min_level: Some(1) });

        let cond = parser().parse("Extended remote area").unwrap();
        assert_eq!(cond.params, ConditionParams::Remote { min_level: Some(2) });

        let cond = parser().parse("极偏远地区").unwrap();
        assert_eq!(cond.params, ConditionParams::Remote { min_level: Some(2) });
    }

    #[test]
    fn test_date_range() {
        let cond = parser().parse("旺季附加费 2024-11-01 至 2024-12-31").unwrap();
        assert_eq!(cond.kind(), ConditionKind::Unknown);
        assert_eq!(cond.special_type(), Some(SpecialType::DateRange));
        assert_eq!(
            cond.params,
            ConditionParams::Unknown {
                special: Some(SpecialType::DateRange),
                date_range: Some(DateRange {
                    start: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
                    end: NaiveDate::from_ymd_opt(2024, 12, 31),
                }),
            }
        );

        let cond = parser().parse("peak season from 12/31/2024").unwrap();
        assert_eq!(cond.special_type(), Some(SpecialType::DateRange));

        let cond = parser().parse("自2025年1月5日起").unwrap();
        assert_eq!(cond.special_type(), Some(SpecialType::DateRange));
    }

    #[test]
    fn test_trailing_date_range_accepts_dotted_dates() {
        // 点分日期不触发日期分类，但在最后的日期区间解析中被识别
        let cond = parser().parse("peak 2024.11.01").unwrap();
        assert_eq!(cond.special_type(), Some(SpecialType::DateRange));
    }

    #[test]
    fn test_special_phrases() {
        let cond = parser().parse("FedEx Home Delivery").unwrap();
        assert_eq!(
            cond.params,
            ConditionParams::Residential {
                expected: Some(true)
            }
        );

        let cond = parser().parse("Adult signature required").unwrap();
        assert_eq!(cond.special_type(), Some(SpecialType::Signature));

        let cond = parser().parse("修改地址费").unwrap();
        assert_eq!(cond.special_type(), Some(SpecialType::AddressCorrection));

        let cond = parser().parse("第二长边超过30英寸").unwrap();
        assert_eq!(
            cond.params,
            ConditionParams::Length {
                range: NumericRange::greater_than(dec("30")),
                dimension: DimensionSelector::SecondLongest,
            }
        );
    }

    #[test]
    fn test_english_second_longest_side() {
        let cond = parser().parse("second longest side > 30").unwrap();
        assert_eq!(
            cond.params,
            ConditionParams::Length {
                range: NumericRange::greater_than(dec("30")),
                dimension: DimensionSelector::SecondLongest,
            }
        );
    }

    #[test]
    fn test_dimension_and_volumetric() {
        let cond = parser().parse("尺寸超过96英寸").unwrap();
        assert_eq!(cond.kind(), ConditionKind::Length);
        assert_eq!(range_of(&cond).min, Some(dec("96")));

        let cond = parser().parse("体积重附加费").unwrap();
        assert_eq!(cond.special_type(), Some(SpecialType::VolumetricWeight));
    }

    #[test]
    fn test_unrecognized_text() {
        assert!(parser().parse("fuel surcharge").is_none());
        assert!(parser().parse("").is_none());
        assert!(parser().parse("   ").is_none());
    }

    #[test]
    fn test_extract_numbers_in_order() {
        assert_eq!(
            parser().extract_numbers("between 12.5 and 40, not 7"),
            vec![Some(dec("12.5")), Some(dec("40")), Some(dec("7"))]
        );
    }

    #[test]
    fn test_fullwidth_digits() {
        assert_eq!(
            parser().extract_numbers("重量大于１００磅"),
            vec![Some(dec("100"))]
        );
        assert_eq!(
            parser().extract_numbers("长度+周长超过１６５.５英寸"),
            vec![Some(dec("165.5"))]
        );

        let cond = parser().parse("重量大于１００磅").unwrap();
        assert_eq!(range_of(&cond), NumericRange::greater_than(dec("100")));
    }

    #[test]
    fn test_unparseable_number_keeps_its_position() {
        let text = "weight between 99999999999999999999999999999999 and 5 and 10 lb";
        assert_eq!(
            parser().extract_numbers(text),
            vec![None, Some(dec("5")), Some(dec("10"))]
        );

        // 溢出的下限不能被后面的数字顶替
        let cond = parser().parse(text).unwrap();
        assert!(range_of(&cond).is_unconstrained());

        let cond = parser().parse("weight > 99999999999999999999999999999999 lb").unwrap();
        assert!(range_of(&cond).is_unconstrained());

        // 其他书写系统的数字同样占位
        assert_eq!(parser().extract_numbers("weight > ٣ or 5"), vec![None, Some(dec("5"))]);
    }

    #[test]
    fn test_custom_keywords() {
        let mut keywords = KeywordSet::default();
        keywords.remote.push("entlegen".to_string());
        let parser = ConditionParser::with_keywords(keywords).unwrap();

        let cond = parser.parse("Entlegenes Gebiet").unwrap();
        assert_eq!(cond.kind(), ConditionKind::Remote);
    }
}
