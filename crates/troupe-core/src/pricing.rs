//! Per-model pricing used to attribute cost to LLM calls.

use tracing::warn;

/// Price per 1K tokens for one model family.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub prompt: f64,
    pub completion: f64,
}

/// Pricing table keyed by model name fragment.
///
/// Entries are matched by substring against the lowercased model name, so
/// dated variants like `gpt-4-turbo-2024-04-09` resolve to their family.
const PRICING: &[(&str, ModelPricing)] = &[
    (
        "gpt-4-turbo",
        ModelPricing {
            prompt: 0.01,
            completion: 0.03,
        },
    ),
    (
        "gpt-4",
        ModelPricing {
            prompt: 0.03,
            completion: 0.06,
        },
    ),
    (
        "gpt-3.5-turbo-16k",
        ModelPricing {
            prompt: 0.003,
            completion: 0.004,
        },
    ),
    (
        "gpt-3.5-turbo",
        ModelPricing {
            prompt: 0.0015,
            completion: 0.002,
        },
    ),
];

/// Fallback pricing for unknown models.
const FALLBACK: ModelPricing = ModelPricing {
    prompt: 0.0015,
    completion: 0.002,
};

/// Look up pricing for a model name.
pub fn pricing_for(model: &str) -> ModelPricing {
    let key = model.to_lowercase();
    for (fragment, pricing) in PRICING {
        if key.contains(fragment) {
            return *pricing;
        }
    }
    warn!(model = %model, "unknown model for pricing, using fallback");
    FALLBACK
}

/// Calculate the cost of one call, rounded to 6 decimal places.
pub fn cost_for(model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let pricing = pricing_for(model);
    let cost = (prompt_tokens as f64 / 1000.0) * pricing.prompt
        + (completion_tokens as f64 / 1000.0) * pricing.completion;
    (cost * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_variants_resolve_to_family() {
        let turbo = pricing_for("GPT-4-Turbo-2024-04-09");
        assert_eq!(turbo.prompt, 0.01);

        let base = pricing_for("gpt-4-0613");
        assert_eq!(base.prompt, 0.03);
    }

    #[test]
    fn unknown_model_uses_fallback() {
        let p = pricing_for("definitely-not-a-model");
        assert_eq!(p.prompt, FALLBACK.prompt);
    }

    #[test]
    fn cost_is_rounded_per_thousand_tokens() {
        // 1000 prompt + 1000 completion on gpt-4 = 0.03 + 0.06
        let cost = cost_for("gpt-4", 1000, 1000);
        assert!((cost - 0.09).abs() < 1e-9);
    }
}
