// ============================================================================
// Structure : RateTable
// ============================================================================
// Table de taux de change relative à une devise de base
//
// Invariants :
// - la devise de base vaut toujours exactement 1
// - toutes les valeurs sont des nombres finis strictement positifs
// - les codes sont en minuscules (BTreeMap => ordre trié gratuit)
// ============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Devise de base utilisée quand aucune n'est fournie
pub const DEFAULT_BASE: &str = "usd";

/// Table hors-ligne : utilisée sans base sélectionnée, ou en dernier recours
const STATIC_RATES: [(&str, f64); 9] = [
    ("usd", 1.0),
    ("eur", 0.85),
    ("inr", 83.5),
    ("gbp", 0.75),
    ("jpy", 110.0),
    ("aud", 1.3),
    ("cad", 1.25),
    ("chf", 0.92),
    ("cny", 7.2),
];

/// Nombre minimum de devises pour qu'une table soit exploitable
pub const MIN_USABLE_CURRENCIES: usize = 2;

/// Provenance d'une table de taux
#[derive(Debug, Clone, PartialEq)]
pub enum RateOrigin {
    /// Table codée en dur
    Builtin,

    /// Table reçue d'une source réseau
    Live {
        source: String,
        fetched_at: DateTime<Utc>,
    },
}

/// Table de taux (code -> taux) relative à `base`
///
/// CONCEPT RUST : Immutabilité
/// - Aucune méthode `&mut self` publique : une table n'est jamais modifiée
///   en place, on en crée une nouvelle à chaque fetch
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: String,
    rates: BTreeMap<String, f64>,
    origin: RateOrigin,
}

impl RateTable {
    /// Construit la table hors-ligne (base "usd")
    pub fn static_default() -> Self {
        let rates = STATIC_RATES
            .iter()
            .map(|&(code, rate)| (code.to_string(), rate))
            .collect();

        Self {
            base: DEFAULT_BASE.to_string(),
            rates,
            origin: RateOrigin::Builtin,
        }
    }

    /// Construit une table à partir de paires (code, taux) déjà numériques
    ///
    /// Passe par la même normalisation que les réponses réseau.
    pub fn from_pairs<I, S>(base: &str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let raw = pairs
            .into_iter()
            .map(|(code, rate)| (code.as_ref().to_string(), Value::from(rate)));
        normalize_rates(base, raw)
    }

    /// Change la provenance (consomme self, builder pattern)
    pub fn with_origin(mut self, origin: RateOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn origin(&self) -> &RateOrigin {
        &self.origin
    }

    /// Taux d'un code, 0 si inconnu (0 = "pas de taux connu")
    pub fn get(&self, code: &str) -> f64 {
        self.rates.get(code).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Codes triés (ordre lexicographique du BTreeMap)
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    /// Une table est exploitable si elle contient au moins 2 devises
    pub fn is_usable(&self) -> bool {
        self.rates.len() >= MIN_USABLE_CURRENCIES
    }

    /// Taux croisé `from -> to` : table[to] / table[from]
    ///
    /// Quand `from` est la base, table[from] == 1 et on retrouve table[to].
    /// Retourne 0 si l'un des deux codes est absent.
    pub fn cross_rate(&self, from: &str, to: &str) -> f64 {
        let from_rate = self.get(from);
        let to_rate = self.get(to);

        if from_rate > 0.0 && to_rate > 0.0 {
            let rate = to_rate / from_rate;
            if rate.is_finite() {
                return rate;
            }
        }
        0.0
    }

    /// Réexprime la table par rapport à une autre base présente dans la table
    ///
    /// Retourne None si `new_base` est absent.
    pub fn rebased(&self, new_base: &str) -> Option<Self> {
        let pivot = self.rates.get(new_base).copied()?;

        let raw = self
            .rates
            .iter()
            .map(|(code, rate)| (code.clone(), Value::from(rate / pivot)));

        Some(normalize_rates(new_base, raw).with_origin(self.origin.clone()))
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::static_default()
    }
}

// ============================================================================
// Normalisation
// ============================================================================

/// Normalise une map brute (code -> valeur JSON) en RateTable
///
/// - codes en minuscules
/// - valeurs numériques ou chaînes numériques converties en f64
/// - entrées non finies, nulles ou négatives ignorées silencieusement
/// - la base est forcée à exactement 1
pub fn normalize_rates<I, S>(base: &str, raw: I) -> RateTable
where
    I: IntoIterator<Item = (S, Value)>,
    S: AsRef<str>,
{
    let base = normalize_code(base);
    let base = if base.is_empty() {
        DEFAULT_BASE.to_string()
    } else {
        base
    };

    let mut rates = BTreeMap::new();
    for (code, value) in raw {
        let code = normalize_code(code.as_ref());
        if code.is_empty() {
            continue;
        }
        if let Some(rate) = coerce_rate(&value) {
            rates.insert(code, rate);
        }
    }

    rates.insert(base.clone(), 1.0);

    RateTable {
        base,
        rates,
        origin: RateOrigin::Builtin,
    }
}

/// Code devise normalisé : trim + minuscules
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Convertit une valeur JSON en taux valide
fn coerce_rate(value: &Value) -> Option<f64> {
    let num = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    (num.is_finite() && num > 0.0).then_some(num)
}

/// Arrondi à 4 décimales, utilisé pour toute valeur dérivée
///
/// Les valeurs non finies deviennent 0.
pub fn round4(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded.is_finite() {
        rounded
    } else {
        0.0
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
