use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, CountryName, StreetName};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{FreeEmail, SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fakeschema_core::Value;
use rand::Rng;
use serde_json::Value as JsonValue;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::params::{ParamKind, ParamSpec, validate_params};

const DEFAULT_TEXT_MAX_CHARS: i64 = 200;

const TEXT_PARAMS: &[ParamSpec] = &[ParamSpec::new("max_nb_chars", ParamKind::Int, false)];
const SENTENCE_PARAMS: &[ParamSpec] = &[ParamSpec::new("nb_words", ParamKind::Int, false)];

const ADJECTIVES: &[&str] = &[
    "Ergonomic", "Rustic", "Sleek", "Handcrafted", "Refined", "Practical", "Compact",
    "Durable", "Gorgeous", "Lightweight", "Modern", "Vintage", "Portable", "Smart",
    "Elegant", "Heavy-duty",
];

const NOUNS: &[&str] = &[
    "Chair", "Table", "Lamp", "Keyboard", "Backpack", "Bottle", "Blender", "Jacket",
    "Notebook", "Speaker", "Kettle", "Wallet", "Helmet", "Clock", "Pillow", "Toaster",
];

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(FakerGenerator {
        id: "name",
        kind: FakerKind::Name,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "first_name",
        kind: FakerKind::FirstName,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "last_name",
        kind: FakerKind::LastName,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "email",
        kind: FakerKind::FreeEmail,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "safe_email",
        kind: FakerKind::SafeEmail,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "user_name",
        kind: FakerKind::Username,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "phone_number",
        kind: FakerKind::PhoneNumber,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "street_address",
        kind: FakerKind::StreetAddress,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "city",
        kind: FakerKind::City,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "country",
        kind: FakerKind::Country,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "company",
        kind: FakerKind::Company,
    }));
    registry.register_generator(Box::new(FakerGenerator {
        id: "word",
        kind: FakerKind::Word,
    }));
    registry.register_generator(Box::new(SentenceGenerator));
    registry.register_generator(Box::new(TextGenerator));
    registry.register_generator(Box::new(ProductNameGenerator));
}

#[derive(Clone, Copy)]
enum FakerKind {
    Name,
    FirstName,
    LastName,
    FreeEmail,
    SafeEmail,
    Username,
    PhoneNumber,
    StreetAddress,
    City,
    Country,
    Company,
    Word,
}

/// Parameterless producers backed by the `fake` crate (en locale).
struct FakerGenerator {
    id: &'static str,
    kind: FakerKind,
}

impl Generator for FakerGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn pii_tags(&self) -> &'static [&'static str] {
        match self.kind {
            FakerKind::Name | FakerKind::FirstName | FakerKind::LastName => &["pii.name"],
            FakerKind::FreeEmail | FakerKind::SafeEmail => &["pii.email"],
            FakerKind::Username => &["pii.username"],
            FakerKind::PhoneNumber => &["pii.phone"],
            FakerKind::StreetAddress => &["pii.address"],
            _ => &[],
        }
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        validate_params(params, &[], self.id)?;
        let value: String = match self.kind {
            FakerKind::Name => Name().fake_with_rng(rng),
            FakerKind::FirstName => FirstName().fake_with_rng(rng),
            FakerKind::LastName => LastName().fake_with_rng(rng),
            FakerKind::FreeEmail => FreeEmail().fake_with_rng(rng),
            FakerKind::SafeEmail => SafeEmail().fake_with_rng(rng),
            FakerKind::Username => Username().fake_with_rng(rng),
            FakerKind::PhoneNumber => PhoneNumber().fake_with_rng(rng),
            FakerKind::StreetAddress => {
                let number: String = BuildingNumber().fake_with_rng(rng);
                let street: String = StreetName().fake_with_rng(rng);
                format!("{number} {street}")
            }
            FakerKind::City => CityName().fake_with_rng(rng),
            FakerKind::Country => CountryName().fake_with_rng(rng),
            FakerKind::Company => CompanyName().fake_with_rng(rng),
            FakerKind::Word => Word().fake_with_rng(rng),
        };
        Ok(Value::Text(value))
    }
}

struct SentenceGenerator;

impl Generator for SentenceGenerator {
    fn id(&self) -> &'static str {
        "sentence"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, SENTENCE_PARAMS, self.id())?;
        let words = params.get_i64("nb_words").unwrap_or(6);
        if words <= 0 {
            return Err(GenerationError::InvalidArguments(
                "sentence nb_words must be > 0".to_string(),
            ));
        }
        let words = words as usize;
        let value: String = Sentence(words..words + 1).fake_with_rng(rng);
        Ok(Value::Text(value))
    }
}

/// Lorem paragraphs cut at a word boundary below `max_nb_chars`.
struct TextGenerator;

impl Generator for TextGenerator {
    fn id(&self) -> &'static str {
        "text"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        let params = validate_params(params, TEXT_PARAMS, self.id())?;
        let max_chars = params.get_i64("max_nb_chars").unwrap_or(DEFAULT_TEXT_MAX_CHARS);
        if max_chars < 5 {
            return Err(GenerationError::InvalidArguments(
                "text max_nb_chars must be >= 5".to_string(),
            ));
        }
        let max_chars = max_chars as usize;

        let paragraph: String = Paragraph(2..5).fake_with_rng(rng);
        Ok(Value::Text(truncate_words(&paragraph, max_chars)))
    }
}

/// Adjective + noun, e.g. "Rustic Lamp".
struct ProductNameGenerator;

impl Generator for ProductNameGenerator {
    fn id(&self) -> &'static str {
        "product_name"
    }

    fn generate(
        &self,
        _ctx: &mut GeneratorContext<'_>,
        params: Option<&JsonValue>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Value, GenerationError> {
        validate_params(params, &[], self.id())?;
        let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
        let noun = NOUNS[rng.random_range(0..NOUNS.len())];
        Ok(Value::Text(format!("{adjective} {noun}")))
    }
}

fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out = String::new();
    for word in text.split_whitespace() {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() + 1 > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    let trimmed = out.trim_end_matches(|ch: char| !ch.is_alphanumeric());
    format!("{trimmed}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::sequence::SequenceProvider;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    fn run(id: &str, params: Option<JsonValue>, seed: u64) -> Result<Value, GenerationError> {
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
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        generator.generate(&mut ctx, params.as_ref(), &mut rng)
    }

    #[test]
    fn faker_producers_are_seed_stable() {
        for id in ["first_name", "email", "street_address", "company"] {
            let a = run(id, None, 11).unwrap();
            let b = run(id, None, 11).unwrap();
            assert_eq!(a, b, "{id} should be deterministic");
            assert!(!a.as_str().unwrap().is_empty());
        }
    }

    #[test]
    fn email_looks_like_an_address() {
        let value = run("email", None, 3).unwrap();
        assert!(value.as_str().unwrap().contains('@'));
    }

    #[test]
    fn product_name_has_two_words() {
        let value = run("product_name", None, 5).unwrap();
        let text = value.as_str().unwrap();
        let (adjective, noun) = text.split_once(' ').unwrap();
        assert!(ADJECTIVES.contains(&adjective));
        assert!(NOUNS.contains(&noun));
    }

    #[test]
    fn text_respects_max_chars() {
        let value = run("text", Some(json!({"max_nb_chars": 40})), 9).unwrap();
        assert!(value.as_str().unwrap().chars().count() <= 40);
        assert!(run("text", Some(json!({"max_nb_chars": 1})), 9).is_err());
    }

    #[test]
    fn semantic_producers_tag_pii() {
        let registry = GeneratorRegistry::new();
        assert_eq!(
            registry.generator("email").unwrap().pii_tags(),
            &["pii.email"]
        );
        assert!(registry.generator("company").unwrap().pii_tags().is_empty());
    }
}
