// SPDX-License-Identifier: AGPL-3.0-only

//! Parameterization consistency registry.
//!
//! The crux of cache safety. Multiple worker threads each hold their
//! own mutable model instance while sharing one calculator; if those
//! instances were parameterized differently, the cache would mix curves
//! computed under different configurations. The registry records the
//! first-encountered instance's parameter values as the permanent
//! reference for its logical identity and proves every later instance
//! (and every later mutation, via the generation counter) matches it.
//!
//! A mismatch is a programming/configuration error — one cache is being
//! shared across incompatibly configured models — and fails hard with
//! the parameter name and both values.

use crate::calc::keys::UniqueGmm;
use crate::error::{HazardError, Result};
use crate::gmm::{GroundMotionModel, InstanceId, Param, PERIOD_PARAM};
use dashmap::DashMap;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct InstanceRecord {
    key: UniqueGmm,
    /// Generation observed at the last successful validation. A
    /// differing current generation means some tracked parameter was
    /// touched since and the value check must run again; the check is
    /// skipped otherwise because it would be costly on every rupture.
    generation: u64,
}

/// Registry of logical model identities and their reference
/// parameterizations.
#[derive(Debug, Default)]
pub struct GmmIdentityRegistry {
    include_imt_in_identity: bool,
    track_imt_params: bool,
    /// Logical identity → reference parameter snapshot (cloned from
    /// the first instance ever encountered; never replaced).
    references: DashMap<UniqueGmm, Vec<Param>>,
    /// Instance → its identity and last-validated generation.
    instances: DashMap<InstanceId, InstanceRecord>,
    /// Single lock serializing the first-encounter registration paths;
    /// taken at most once per distinct model instance.
    registration: Mutex<()>,
}

impl GmmIdentityRegistry {
    /// Registry for hazard-curve use: IMT is a separate cache axis and
    /// IMT parameters are untracked.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry for spectra use: the IMT name joins the model identity
    /// and IMT-dependent parameters (except the period) are tracked.
    #[must_use]
    pub fn for_spectra() -> Self {
        Self {
            include_imt_in_identity: true,
            track_imt_params: true,
            ..Self::default()
        }
    }

    /// The logical identity key for a model, with no registration side
    /// effects.
    #[must_use]
    pub fn identity_of(&self, gmm: &dyn GroundMotionModel) -> UniqueGmm {
        if self.include_imt_in_identity {
            UniqueGmm::of_with_imt(gmm)
        } else {
            UniqueGmm::of(gmm)
        }
    }

    /// Resolve a model instance to its cache key, registering or
    /// revalidating as needed.
    ///
    /// Fast path (the dominant case): the instance is known and its
    /// generation counter is unchanged — one map read, no value
    /// comparison.
    ///
    /// # Errors
    ///
    /// [`HazardError::ParameterMismatch`] / [`HazardError::UnknownParameter`]
    /// when this instance's tracked parameters disagree with the
    /// reference parameterization for its logical identity.
    pub fn resolve(&self, gmm: &dyn GroundMotionModel) -> Result<UniqueGmm> {
        let id = gmm.instance_id();
        let generation = self.effective_generation(gmm);

        if let Some(key) = self.check_known(id, generation, gmm)? {
            return Ok(key);
        }

        // First encounter of this instance: serialize registration so
        // exactly one reference parameterization ever exists per
        // logical identity.
        let _guard = self.registration.lock();
        if let Some(key) = self.check_known(id, generation, gmm)? {
            // another thread registered this instance while we waited
            return Ok(key);
        }

        let key = self.identity_of(gmm);
        let tracked = self.tracked_params(gmm);
        if let Some(reference) = self.references.get(&key) {
            // known logical identity, new instance: must match the
            // reference exactly
            assert_params_match(&reference, &tracked, gmm.name())?;
        } else {
            // first instance of this logical identity: its cloned
            // values become the permanent reference
            self.references.insert(key.clone(), tracked);
        }
        self.instances.insert(
            id,
            InstanceRecord {
                key: key.clone(),
                generation,
            },
        );
        Ok(key)
    }

    /// Known-instance path: `Ok(Some(key))` when registered (after any
    /// due revalidation), `Ok(None)` when never seen.
    fn check_known(
        &self,
        id: InstanceId,
        generation: u64,
        gmm: &dyn GroundMotionModel,
    ) -> Result<Option<UniqueGmm>> {
        let Some(mut record) = self.instances.get_mut(&id) else {
            return Ok(None);
        };
        if record.generation != generation {
            // a tracked parameter was touched; prove the current values
            // still match the reference before reusing the cache
            let reference = self
                .references
                .get(&record.key)
                .map(|r| r.value().clone())
                .ok_or_else(|| {
                    HazardError::ModelFailure(format!(
                        "instance registered without a reference parameterization for {}",
                        record.key
                    ))
                })?;
            assert_params_match(&reference, &self.tracked_params(gmm), gmm.name())?;
            record.generation = generation;
        }
        Ok(Some(record.key.clone()))
    }

    fn effective_generation(&self, gmm: &dyn GroundMotionModel) -> u64 {
        let mut g = gmm.param_generation();
        if self.track_imt_params {
            g += gmm.intensity_measure().params.generation();
        }
        g
    }

    /// The tracked parameter set: "other" configuration parameters,
    /// site parameters (the site location itself is not a parameter
    /// and legitimately varies per call), and — in spectra mode — the
    /// IMT's parameters excluding the spectral period.
    fn tracked_params(&self, gmm: &dyn GroundMotionModel) -> Vec<Param> {
        let mut out: Vec<Param> = gmm
            .other_params()
            .iter()
            .chain(gmm.site_params().iter())
            .cloned()
            .collect();
        if self.track_imt_params {
            out.extend(
                gmm.intensity_measure()
                    .params
                    .iter()
                    .filter(|p| p.name != PERIOD_PARAM)
                    .cloned(),
            );
        }
        out
    }

    /// Number of distinct instances tracked.
    #[must_use]
    pub fn instances_tracked(&self) -> usize {
        self.instances.len()
    }

    /// Number of distinct logical identities with a reference
    /// parameterization.
    #[must_use]
    pub fn references_tracked(&self) -> usize {
        self.references.len()
    }

    /// Display strings of every known logical identity (diagnostics).
    #[must_use]
    pub fn known_identities(&self) -> Vec<String> {
        let mut known: Vec<String> = self.references.iter().map(|r| r.key().to_string()).collect();
        known.sort();
        known
    }
}

fn assert_params_match(reference: &[Param], candidate: &[Param], model: &str) -> Result<()> {
    for p in reference {
        let found = candidate
            .iter()
            .find(|c| c.name == p.name)
            .ok_or_else(|| HazardError::UnknownParameter {
                model: model.to_string(),
                param: p.name.clone(),
            })?;
        if found.value != p.value {
            return Err(HazardError::ParameterMismatch {
                model: model.to_string(),
                param: p.name.clone(),
                expected: p.value.to_string(),
                found: found.value.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmm::synthetic::{SyntheticAttenuation, MAX_DIST_PARAM, VS30_PARAM};
    use crate::gmm::ParamValue;

    #[test]
    fn matching_instances_share_a_key() {
        let reg = GmmIdentityRegistry::new();
        let a = SyntheticAttenuation::new();
        let b = SyntheticAttenuation::new();
        let ka = reg.resolve(&a).unwrap();
        let kb = reg.resolve(&b).unwrap();
        assert_eq!(ka, kb);
        assert_eq!(reg.instances_tracked(), 2);
        assert_eq!(reg.references_tracked(), 1);
    }

    #[test]
    fn mismatched_other_param_is_rejected_by_name() {
        let reg = GmmIdentityRegistry::new();
        let a = SyntheticAttenuation::new();
        reg.resolve(&a).unwrap();

        let mut b = SyntheticAttenuation::new();
        b.set_other_param(MAX_DIST_PARAM, ParamValue::f64(300.0));
        let err = reg.resolve(&b).unwrap_err();
        match err {
            HazardError::ParameterMismatch { param, expected, found, .. } => {
                assert_eq!(param, MAX_DIST_PARAM);
                assert_eq!(expected, "200");
                assert_eq!(found, "300");
            }
            other => panic!("expected ParameterMismatch, got {other}"),
        }
    }

    #[test]
    fn mismatched_site_param_is_rejected() {
        let reg = GmmIdentityRegistry::new();
        let a = SyntheticAttenuation::new();
        reg.resolve(&a).unwrap();

        let mut b = SyntheticAttenuation::new();
        b.set_site_param(VS30_PARAM, ParamValue::f64(360.0));
        assert!(matches!(
            reg.resolve(&b),
            Err(HazardError::ParameterMismatch { .. })
        ));
    }

    #[test]
    fn repeat_resolution_is_stable() {
        let reg = GmmIdentityRegistry::new();
        let a = SyntheticAttenuation::new();
        let k1 = reg.resolve(&a).unwrap();
        let k2 = reg.resolve(&a).unwrap();
        assert_eq!(k1, k2);
        assert_eq!(reg.instances_tracked(), 1);
    }

    #[test]
    fn mutation_to_same_value_revalidates_silently() {
        let reg = GmmIdentityRegistry::new();
        let mut a = SyntheticAttenuation::new();
        reg.resolve(&a).unwrap();
        // touch the parameter without changing its value: generation
        // moves, validation runs, and passes
        a.set_other_param(MAX_DIST_PARAM, ParamValue::f64(200.0));
        assert!(reg.resolve(&a).is_ok());
    }

    #[test]
    fn mutation_to_different_value_is_caught() {
        let reg = GmmIdentityRegistry::new();
        let a = SyntheticAttenuation::new();
        let mut b = SyntheticAttenuation::new();
        reg.resolve(&a).unwrap();
        reg.resolve(&b).unwrap();
        // drift the second instance after registration
        b.set_other_param(MAX_DIST_PARAM, ParamValue::f64(250.0));
        assert!(matches!(
            reg.resolve(&b),
            Err(HazardError::ParameterMismatch { .. })
        ));
        // the untouched instance is unaffected
        assert!(reg.resolve(&a).is_ok());
    }

    #[test]
    fn reference_instance_drift_is_caught_too() {
        let reg = GmmIdentityRegistry::new();
        let mut a = SyntheticAttenuation::new();
        reg.resolve(&a).unwrap();
        a.set_other_param(MAX_DIST_PARAM, ParamValue::f64(150.0));
        // the reference snapshot was cloned at registration; the
        // reference instance itself drifting must also be caught
        assert!(matches!(
            reg.resolve(&a),
            Err(HazardError::ParameterMismatch { .. })
        ));
    }

    #[test]
    fn spectra_registry_tracks_imt_params() {
        use crate::gmm::Imt;
        let reg = GmmIdentityRegistry::for_spectra();
        let mut a = SyntheticAttenuation::new();
        a.set_intensity_measure(Imt::sa(1.0));
        reg.resolve(&a).unwrap();

        let mut b = SyntheticAttenuation::new();
        let mut imt = Imt::sa(1.0);
        imt.params.set("SA Damping", ParamValue::f64(10.0));
        b.set_intensity_measure(imt);
        let err = reg.resolve(&b).unwrap_err();
        assert!(err.to_string().contains("SA Damping"), "got: {err}");
    }

    #[test]
    fn spectra_registry_ignores_period_differences() {
        use crate::gmm::Imt;
        let reg = GmmIdentityRegistry::for_spectra();
        let mut a = SyntheticAttenuation::new();
        a.set_intensity_measure(Imt::sa(1.0));
        reg.resolve(&a).unwrap();

        let mut b = SyntheticAttenuation::new();
        b.set_intensity_measure(Imt::sa(2.0));
        assert!(reg.resolve(&b).is_ok(), "period is not a tracked parameter");
    }

    #[test]
    fn known_identities_lists_display_names() {
        let reg = GmmIdentityRegistry::new();
        let a = SyntheticAttenuation::new();
        reg.resolve(&a).unwrap();
        let known = reg.known_identities();
        assert_eq!(known.len(), 1);
        assert!(known[0].contains("Synthetic Attenuation"));
    }
}
