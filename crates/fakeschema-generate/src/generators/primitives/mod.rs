use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use fakeschema_core::Value;
use rand::Rng;
use rand_regex::Regex as RandRegex;
use serde_json::Value as JsonValue;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::params::{ParamKind, ParamSpec, validate_params};

const DEFAULT_INT_MIN: i64 = 0;
const DEFAULT_INT_MAX: i64 = 9999;
const DEFAULT_FLOAT_MIN: f64 = 0.0;
const DEFAULT_FLOAT_MAX: f64 = 10000.0;
const DEFAULT_MAX_REPEAT: u32 = 32;
const DEFAULT_DATE_SPAN_DAYS: i64 = 30 * 365;

const INT_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Int, false),
    ParamSpec::new("max", ParamKind::Int, false),
    ParamSpec::new("step", ParamKind::Int, false),
];
const FLOAT_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Float, false),
    ParamSpec::new("max", ParamKind::Float, false),
    ParamSpec::new("digits", ParamKind::Int, false),
];
const BOOL_PARAMS: &[ParamSpec] = &[ParamSpec::new(
    "chance_of_getting_true",
    ParamKind::Int,
    false,
)];
const ELEMENT_PARAMS: &[ParamSpec] = &[ParamSpec::new("elements", ParamKind::Array, true)];
const DATE_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("start", ParamKind::Date, false),
    ParamSpec::new("end", ParamKind::Date, false),
];
const PATTERN_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("pattern", ParamKind::String, true),
    ParamSpec::new("max_repeat", ParamKind::Int, false),
];
const NUMERIFY_PARAMS: &[ParamSpec] = &[ParamSpec::new("text", ParamKind::String, false)];
const CONSTANT_PARAMS: &[ParamSpec] = &[ParamSpec::new("value", ParamKind::Any, true)];

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(IntRangeGenerator));
    registry.register_generator(Box::new(FloatRangeGenerator));
    registry.register_generator(Box::new(BoolGenerator));
    registry.register_generator(Box::new(UuidGenerator));
    registry.register_generator(Box::new(RandomElementGenerator));
    registry.register_generator(Box::new(ThisYearGenerator {
        id: "date_time_this_year",
        with_time: true,
    }));
    registry.register_generator(Box::new(ThisYearGenerator {
        id: "date_this_year",
        with_time: false,
    }));
    registry.register_generator(Box::new(DateBetweenGenerator));
    registry.register_generator(Box::new(RegexifyGenerator));
    registry.register_generator(Box::new(NumerifyGenerator));
    registry.register_generator(Box::new(ConstantGenerator));
}

struct IntRangeGenerator;

impl Generator for IntRangeGenerator {
    fn id(&self) -> &'static str {
        "random_int"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, INT_RANGE_PARAMS, self.id())?;
        let min = params.get_i64("min").unwrap_or(DEFAULT_INT_MIN);
        let max = params.get_i64("max").unwrap_or(DEFAULT_INT_MAX);
        let step = params.get_i64("step").unwrap_or(1);
        if min > max {
            return Err(GenerationError::InvalidArguments(
                "random_int min must be <= max".to_string(),
            ));
        }
        if step <= 0 {
            return Err(GenerationError::InvalidArguments(
                "random_int step must be > 0".to_string(),
            ));
        }
        let slots = max.saturating_sub(min) / step;
        let value = min.saturating_add(rng.random_range(0..=slots).saturating_mul(step));
        Ok(Value::Int(value))
    }
}

struct FloatRangeGenerator;

impl Generator for FloatRangeGenerator {
    fn id(&self) -> &'static str {
        "random_float"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, FLOAT_RANGE_PARAMS, self.id())?;
        let min = params.get_f64("min").unwrap_or(DEFAULT_FLOAT_MIN);
        let max = params.get_f64("max").unwrap_or(DEFAULT_FLOAT_MAX);
        if min > max {
            return Err(GenerationError::InvalidArguments(
                "random_float min must be <= max".to_string(),
            ));
        }
        if !(max - min).is_finite() {
            return Err(GenerationError::InvalidArguments(
                "random_float range is too wide".to_string(),
            ));
        }
        let value = rng.random_range(min..=max);
        let Some(digits) = params.get_i64("digits") else {
            return Ok(Value::Float(value));
        };
        if !(0..=15).contains(&digits) {
            return Err(GenerationError::InvalidArguments(
                "random_float digits must be within 0..=15".to_string(),
            ));
        }
        let factor = 10_f64.powi(digits as i32);
        let rounded = ((value * factor).round() / factor).clamp(min, max);
        Ok(Value::Float(rounded))
    }
}

struct BoolGenerator;

impl Generator for BoolGenerator {
    fn id(&self) -> &'static str {
        "boolean"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, BOOL_PARAMS, self.id())?;
        let chance = params.get_i64("chance_of_getting_true").unwrap_or(50);
        if !(0..=100).contains(&chance) {
            return Err(GenerationError::InvalidArguments(
                "boolean chance_of_getting_true must be within 0..=100".to_string(),
            ));
        }
        Ok(Value::Bool(rng.random_bool(chance as f64 / 100.0)))
    }
}

struct UuidGenerator;

impl Generator for UuidGenerator {
    fn id(&self) -> &'static str {
        "uuid4"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        validate_params(params, &[], self.id())?;
        let bytes: [u8; 16] = rng.random();
        let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
        Ok(Value::Uuid(uuid.to_string()))
    }
}

struct RandomElementGenerator;

impl Generator for RandomElementGenerator {
    fn id(&self) -> &'static str {
        "random_element"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, ELEMENT_PARAMS, self.id())?;
        let elements = params.get_array("elements").unwrap_or_default();
        if elements.is_empty() {
            return Err(GenerationError::InvalidArguments(
                "random_element requires at least one element".to_string(),
            ));
        }
        let picked = &elements[rng.random_range(0..elements.len())];
        Ok(Value::from_json(picked))
    }
}

/// Random instant between January 1st of the anchor year and the anchor day.
struct ThisYearGenerator {
    id: &'static str,
    with_time: bool,
}

impl Generator for ThisYearGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        validate_params(params, &[], self.id)?;
        let start = NaiveDate::from_yo_opt(ctx.today.year(), 1).ok_or_else(|| {
            GenerationError::InvalidArguments(format!("{}: invalid anchor date", self.id))
        })?;
        if !self.with_time {
            let days = (ctx.today - start).num_days();
            return Ok(Value::Date(start + Duration::days(rng.random_range(0..=days))));
        }

        let start = start.and_time(NaiveTime::MIN);
        let end = ctx.today.and_time(NaiveTime::MIN) + Duration::seconds(86_399);
        Ok(Value::Timestamp(random_instant(start, end, rng)))
    }
}

struct DateBetweenGenerator;

impl Generator for DateBetweenGenerator {
    fn id(&self) -> &'static str {
        "date_between"
    }

    fn generate(
        &self,
        ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, DATE_RANGE_PARAMS, self.id())?;
        let end = params.get_date("end").unwrap_or(ctx.today);
        let start = params
            .get_date("start")
            .unwrap_or(end - Duration::days(DEFAULT_DATE_SPAN_DAYS));
        if start > end {
            return Err(GenerationError::InvalidArguments(
                "date_between start must be <= end".to_string(),
            ));
        }
        let days = (end - start).num_days();
        Ok(Value::Date(start + Duration::days(rng.random_range(0..=days))))
    }
}

struct RegexifyGenerator;

impl Generator for RegexifyGenerator {
    fn id(&self) -> &'static str {
        "regexify"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, PATTERN_PARAMS, self.id())?;
        let pattern = params.get_str("pattern").ok_or_else(|| {
            GenerationError::InvalidArguments("regexify requires params.pattern".to_string())
        })?;
        let max_repeat = match params.get_i64("max_repeat") {
            Some(value) => u32::try_from(value).map_err(|_| {
                GenerationError::InvalidArguments(
                    "regexify max_repeat must fit u32".to_string(),
                )
            })?,
            None => DEFAULT_MAX_REPEAT,
        };
        let regex = RandRegex::compile(pattern, max_repeat).map_err(|err| {
            GenerationError::InvalidArguments(format!("invalid regex pattern for regexify: {err}"))
        })?;
        let value: String = rng.sample(regex);
        Ok(Value::Text(value))
    }
}

/// Replaces `#` with a digit and `%` with a non-zero digit.
struct NumerifyGenerator;

impl Generator for NumerifyGenerator {
    fn id(&self) -> &'static str {
        "numerify"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, NUMERIFY_PARAMS, self.id())?;
        let text = params.get_str("text").unwrap_or("###");
        let value = text
            .chars()
            .map(|ch| match ch {
                '#' => digit(rng.random_range(0..=9)),
                '%' => digit(rng.random_range(1..=9)),
                other => other,
            })
            .collect();
        Ok(Value::Text(value))
    }
}

struct ConstantGenerator;

impl Generator for ConstantGenerator {
    fn id(&self) -> &'static str {
        "constant"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        _rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, CONSTANT_PARAMS, self.id())?;
        Ok(params
            .get("value")
            .map(Value::from_json)
            .unwrap_or(Value::Null))
    }
}

fn random_instant(
    start: NaiveDateTime,
    end: NaiveDateTime,
    rng: &mut dyn rand::RngCore,
) -> NaiveDateTime {
    let span = (end - start).num_seconds().max(0);
    start + Duration::seconds(rng.random_range(0..=span))
}

fn digit(value: u32) -> char {
    char::from_digit(value, 10).unwrap_or('0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::sequence::SequenceProvider;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    fn run(id: &str, params: Option<JsonValue>) -> Result<Value, GenerationError> {
        let registry = GeneratorRegistry::new();
        let generator = registry.generator(id).expect("registered generator");
        let mut sequences = SequenceProvider::new();
        let mut ctx = GeneratorContext {
            model: "Test",
            field: "value",
            pass_index: 0,
            today: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            sequences: &mut sequences,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        generator.generate(&mut ctx, params.as_ref(), &mut rng)
    }

    #[test]
    fn int_range_respects_bounds_and_step() {
        for _ in 0..20 {
            let value = run("random_int", Some(json!({"min": 10, "max": 20, "step": 5})))
                .unwrap()
                .as_i64()
                .unwrap();
            assert!([10, 15, 20].contains(&value));
        }
        assert!(run("random_int", Some(json!({"min": 5, "max": 1}))).is_err());
    }

    #[test]
    fn float_range_wider_than_f64_is_rejected() {
        let err = run(
            "random_float",
            Some(json!({"min": -1.7e308, "max": 1.7e308})),
        )
        .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidArguments(_)));
    }

    #[test]
    fn float_range_rounds_to_digits() {
        let value = run("random_float", Some(json!({"min": 0.01, "max": 100.0, "digits": 2})))
            .unwrap()
            .as_f64()
            .unwrap();
        assert!((0.01..=100.0).contains(&value));
        assert_eq!((value * 100.0).round() / 100.0, value);
    }

    #[test]
    fn random_element_picks_from_elements() {
        let value = run(
            "random_element",
            Some(json!({"elements": ["Pending", "Paid", "Failed"]})),
        )
        .unwrap();
        assert!(["Pending", "Paid", "Failed"].contains(&value.as_str().unwrap()));
        assert!(run("random_element", Some(json!({"elements": []}))).is_err());
        assert!(run("random_element", None).is_err());
    }

    #[test]
    fn this_year_stays_within_anchor_year() {
        let Value::Timestamp(value) = run("date_time_this_year", None).unwrap() else {
            panic!("expected timestamp");
        };
        assert_eq!(value.year(), 2024);
        assert!(value.date() <= NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    }

    #[test]
    fn date_between_honors_bounds() {
        let Value::Date(value) = run(
            "date_between",
            Some(json!({"start": "2020-01-01", "end": "2020-01-03"})),
        )
        .unwrap() else {
            panic!("expected date");
        };
        assert!(value >= NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert!(value <= NaiveDate::from_ymd_opt(2020, 1, 3).unwrap());
    }

    #[test]
    fn regexify_and_numerify_follow_patterns() {
        let value = run("regexify", Some(json!({"pattern": "[A-Z]{3}-[0-9]{2}"}))).unwrap();
        let regex = regex::Regex::new("^[A-Z]{3}-[0-9]{2}$").unwrap();
        assert!(regex.is_match(value.as_str().unwrap()));

        let value = run("numerify", Some(json!({"text": "SKU-%##"}))).unwrap();
        let regex = regex::Regex::new("^SKU-[1-9][0-9]{2}$").unwrap();
        assert!(regex.is_match(value.as_str().unwrap()));
    }

    #[test]
    fn unknown_params_are_rejected() {
        let err = run("uuid4", Some(json!({"version": 7}))).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidArguments(_)));
    }

    #[test]
    fn constant_returns_literal() {
        assert_eq!(
            run("constant", Some(json!({"value": 3}))).unwrap(),
            Value::Int(3)
        );
    }
}
