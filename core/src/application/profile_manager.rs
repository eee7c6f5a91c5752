//! Profile application service.

use crate::domain::{PortParseError, Profile, ProfileCollection, ServiceRecord};
use crate::error::{Error, Result};
use crate::ports::ProfileStore;

/// What `init` did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    Overwritten,
    /// A document already exists and overwriting was not requested.
    AlreadyExists,
}

/// Outcome of saving a discovered profile.
#[derive(Debug, Clone)]
pub struct SavedProfile {
    pub profile: Profile,
    pub collection: ProfileCollection,
    /// Port tokens dropped while converting the discovered services.
    pub skipped: Vec<PortParseError>,
}

/// A profile ready to run, with the coordinates its services default to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub profile: Profile,
    pub context: String,
    pub namespace: String,
}

/// Application service for profile persistence.
///
/// The store is passed in explicitly; there is no process-wide config.
pub struct ProfileManager<S: ProfileStore> {
    store: S,
}

impl<S: ProfileStore> ProfileManager<S> {
    /// Create a new profile manager over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the collection.
    pub async fn load(&self) -> Result<ProfileCollection> {
        self.store.load().await
    }

    /// Load the collection, treating a missing store as empty.
    pub async fn load_or_default(&self) -> Result<ProfileCollection> {
        match self.store.load().await {
            Ok(profiles) => Ok(profiles),
            Err(Error::NotFound(_)) => Ok(ProfileCollection::default()),
            Err(e) => Err(e),
        }
    }

    /// Write the sample document unless one exists and `overwrite` is false.
    pub async fn init(&self, context: &str, namespace: &str, overwrite: bool) -> Result<InitOutcome> {
        let existed = self.store.exists();
        if existed && !overwrite {
            return Ok(InitOutcome::AlreadyExists);
        }

        self.store
            .save(&ProfileCollection::sample(context, namespace))
            .await?;

        Ok(if existed {
            InitOutcome::Overwritten
        } else {
            InitOutcome::Created
        })
    }

    /// Build a profile from discovered services, merge it into the stored
    /// collection and save the result.
    ///
    /// The new profile becomes the default only when the store has none yet.
    /// Unparsable ports are skipped and reported in the result.
    pub async fn save_discovered(
        &self,
        name: &str,
        context: &str,
        namespace: &str,
        records: &[ServiceRecord],
    ) -> Result<SavedProfile> {
        let (profile, skipped) = Profile::from_discovery(name, context, namespace, records);

        let existing = self.load_or_default().await?;
        let collection = existing.merge(&ProfileCollection::with_default(profile.clone()));
        self.store.save(&collection).await?;

        tracing::info!(
            profile = name,
            services = profile.services.len(),
            skipped = skipped.len(),
            store = %self.store.location(),
            "saved profile"
        );

        Ok(SavedProfile {
            profile,
            collection,
            skipped,
        })
    }

    /// Find the profile to run and the coordinates its services default to.
    ///
    /// Coordinates come from the profile itself, else the caller's values,
    /// else the collection's global defaults.
    pub async fn resolve(
        &self,
        name: Option<&str>,
        context: &str,
        namespace: &str,
    ) -> Result<ResolvedProfile> {
        let collection = self.store.load().await?;
        let profile = collection.resolve(name)?.clone();

        let first_non_empty = |candidates: [&str; 3]| {
            candidates
                .into_iter()
                .find(|c| !c.is_empty())
                .unwrap_or_default()
                .to_string()
        };

        Ok(ResolvedProfile {
            context: first_non_empty([profile.context.as_str(), context, collection.context.as_str()]),
            namespace: first_non_empty([
                profile.namespace.as_str(),
                namespace,
                collection.namespace.as_str(),
            ]),
            profile,
        })
    }
}
