use crate::{
    api::{ApiError, LensApi},
    lens::{Lens, LensId},
};
use std::{collections::BTreeMap, ops::Deref};

/// The ordered list of lenses available for selection
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    lenses: Vec<Lens>,
    index: BTreeMap<LensId, usize>,
}
impl Deref for Catalog {
    type Target = Vec<Lens>;

    fn deref(&self) -> &Self::Target {
        &self.lenses
    }
}
impl From<Vec<Lens>> for Catalog {
    fn from(lenses: Vec<Lens>) -> Self {
        let index = lenses
            .iter()
            .enumerate()
            .map(|(i, lens)| (lens.id, i))
            .collect();
        Self { lenses, index }
    }
}
impl Catalog {
    /// Replaces the whole catalog with the lenses listed by the API
    ///
    /// On failure the catalog keeps its previous content
    pub fn refresh<A: LensApi + ?Sized>(&mut self, api: &A) -> Result<usize, ApiError> {
        match api.lenses() {
            Ok(lenses) => {
                *self = lenses.into();
                log::info!("catalog refreshed: {} lenses", self.len());
                Ok(self.len())
            }
            Err(e) => {
                log::error!("catalog refresh failed, keeping {} lenses: {}", self.len(), e);
                Err(e)
            }
        }
    }
    pub fn get(&self, lens_id: LensId) -> Option<&Lens> {
        self.index.get(&lens_id).map(|&i| &self.lenses[i])
    }
    /// The lens name, or `#<id>` for a lens missing from the catalog
    pub fn label(&self, lens_id: LensId) -> String {
        self.get(lens_id)
            .map(|lens| lens.name.clone())
            .unwrap_or_else(|| format!("#{}", lens_id))
    }
    /// Resolves a lens selection given either as an id or as a name
    pub fn resolve(&self, key: &str) -> Option<LensId> {
        let key = key.trim();
        match key.parse::<LensId>() {
            Ok(id) => Some(id),
            Err(_) => self
                .lenses
                .iter()
                .find(|lens| lens.name == key)
                .map(|lens| lens.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{PreCheck, Submission},
        lens::{Aperture, Region, Sample},
    };
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Flaky {
        fail: AtomicBool,
    }
    impl LensApi for Flaky {
        fn lenses(&self) -> Result<Vec<Lens>, ApiError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(ApiError::Unexpected {
                    url: "lenses".to_string(),
                    reason: "offline".to_string(),
                })
            } else {
                Ok(vec![
                    Lens {
                        id: 3,
                        name: "M.Zuiko 12-40mm".to_string(),
                        device: "m43".to_string(),
                    },
                    Lens {
                        id: 1,
                        name: "Lumix 14-140mm".to_string(),
                        device: "m43".to_string(),
                    },
                ])
            }
        }
        fn samples(&self, _: LensId, _: Region, _: Aperture) -> Result<Vec<Sample>, ApiError> {
            Ok(vec![])
        }
        fn pre_check(&self, _: LensId) -> Result<PreCheck, ApiError> {
            Ok(PreCheck::NotFound)
        }
        fn submit(&self, _: LensId, _: &Submission) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[test]
    fn refresh_keeps_stale_content_on_failure() {
        let api = Flaky {
            fail: AtomicBool::new(false),
        };
        let mut catalog = Catalog::default();
        assert_eq!(catalog.refresh(&api).unwrap(), 2);
        api.fail.store(true, Ordering::SeqCst);
        assert!(catalog.refresh(&api).is_err());
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].id, 3);
        assert_eq!(catalog.label(1), "Lumix 14-140mm");
        assert_eq!(catalog.label(9), "#9");
    }

    #[test]
    fn resolve_by_id_or_name() {
        let api = Flaky {
            fail: AtomicBool::new(false),
        };
        let mut catalog = Catalog::default();
        catalog.refresh(&api).unwrap();
        assert_eq!(catalog.resolve("1"), Some(1));
        assert_eq!(catalog.resolve("M.Zuiko 12-40mm"), Some(3));
        assert_eq!(catalog.resolve("unknown"), None);
    }
}
