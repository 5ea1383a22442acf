//! Environments on every compiled-in engine, for tests that must hold on all
//! of them.

use logstore_core::Module;
use tempfile::TempDir;

use crate::config::StorageConfig;
use crate::storage::catalog::Catalog;
use crate::storage::environment::Environment;

/// An environment, its catalog, and the directory backing it (if any).
pub(crate) struct TestEnv {
    pub env: Environment,
    pub catalog: Catalog,
    pub dir: Option<TempDir>,
}

impl TestEnv {
    fn initialized(env: Environment, dir: Option<TempDir>) -> Self {
        let catalog = Catalog::init(&env, &Module::ALL).unwrap();
        Self { env, catalog, dir }
    }

    fn bare(env: Environment, dir: Option<TempDir>) -> Self {
        Self {
            env,
            catalog: Catalog::uninitialized(),
            dir,
        }
    }

    pub fn memory() -> Self {
        Self::initialized(Environment::in_memory(StorageConfig::default()), None)
    }

    #[cfg(feature = "redb")]
    pub fn redb() -> Self {
        let (env, dir) = redb_env();
        Self::initialized(env, Some(dir))
    }
}

#[cfg(feature = "redb")]
fn redb_env() -> (Environment, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(StorageConfig::with_path(dir.path())).unwrap();
    (env, dir)
}

/// One fresh, fully cataloged environment per compiled-in engine.
pub(crate) fn all_engines() -> Vec<TestEnv> {
    let mut envs = vec![TestEnv::memory()];
    #[cfg(feature = "redb")]
    envs.push(TestEnv::redb());
    envs
}

/// One fresh environment per compiled-in engine, with no namespaces created.
pub(crate) fn all_engines_uninitialized() -> Vec<TestEnv> {
    let mut envs = vec![TestEnv::bare(
        Environment::in_memory(StorageConfig::default()),
        None,
    )];
    #[cfg(feature = "redb")]
    {
        let (env, dir) = redb_env();
        envs.push(TestEnv::bare(env, Some(dir)));
    }
    envs
}
