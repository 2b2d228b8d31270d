//! Per-sample style selection.
//!
//! A style domain is one axis of visual variation (e.g. which writer's
//! handwriting to sample). The [`Styler`] picks every domain once at the
//! start of a sample, so all glyphs of that sample stay consistent.

use crate::error::{Result, SynthError};
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;

pub trait StyleDomain {
    /// Unique name the domain is registered under.
    fn name(&self) -> &str;

    fn pick_style(&mut self, rng: &mut StdRng);

    /// The style picked for the current sample.
    fn current(&self) -> &str;
}

/// Registry of style domains.
#[derive(Default)]
pub struct Styler {
    domains: Vec<Box<dyn StyleDomain>>,
}

impl Styler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_domain(&mut self, domain: Box<dyn StyleDomain>) -> Result<()> {
        if self.domains.iter().any(|d| d.name() == domain.name()) {
            return Err(SynthError::Style(format!(
                "domain '{}' is already registered",
                domain.name()
            )));
        }
        self.domains.push(domain);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&dyn StyleDomain> {
        self.domains
            .iter()
            .find(|d| d.name() == name)
            .map(|d| d.as_ref())
            .ok_or_else(|| SynthError::Style(format!("domain '{name}' is not registered")))
    }

    /// Picks a new style in every domain; call once per sample.
    pub fn pick_style(&mut self, rng: &mut StdRng) {
        for domain in &mut self.domains {
            domain.pick_style(rng);
            debug!("Style domain '{}' picked '{}'", domain.name(), domain.current());
        }
    }
}

/// Which writer's glyphs to sample.
#[derive(Debug, Clone)]
pub struct WriterStyleDomain {
    writers: Vec<String>,
    current: usize,
}

impl WriterStyleDomain {
    pub const NAME: &'static str = "writer";

    /// Fails for an empty writer list. Starts at the first writer.
    pub fn new(writers: Vec<String>) -> Result<Self> {
        if writers.is_empty() {
            return Err(SynthError::Style("there must be at least one writer".into()));
        }
        Ok(Self { writers, current: 0 })
    }

    pub fn writers(&self) -> &[String] {
        &self.writers
    }
}

impl StyleDomain for WriterStyleDomain {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pick_style(&mut self, rng: &mut StdRng) {
        self.current = rng.random_range(0..self.writers.len());
    }

    fn current(&self) -> &str {
        &self.writers[self.current]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn writers() -> Box<WriterStyleDomain> {
        Box::new(WriterStyleDomain::new(vec!["a".into(), "b".into(), "c".into()]).unwrap())
    }

    #[test]
    fn duplicate_and_missing_domains_fail() {
        let mut styler = Styler::new();
        styler.register_domain(writers()).unwrap();
        assert!(styler.register_domain(writers()).is_err());
        assert!(styler.resolve("colour").is_err());
        assert_eq!(styler.resolve(WriterStyleDomain::NAME).unwrap().current(), "a");
    }

    #[test]
    fn picking_is_seeded() {
        let pick = |seed| {
            let mut styler = Styler::new();
            styler.register_domain(writers()).unwrap();
            styler.pick_style(&mut StdRng::seed_from_u64(seed));
            styler.resolve(WriterStyleDomain::NAME).unwrap().current().to_string()
        };
        assert_eq!(pick(7), pick(7));
    }

    #[test]
    fn empty_writer_list_is_rejected() {
        assert!(WriterStyleDomain::new(Vec::new()).is_err());
    }
}
