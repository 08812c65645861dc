//! Registration of the externally deployed Uniswap V2 router.
//!
//! The router is not a constructor argument of any contract deployed here.
//! Recording it in the registry lets later steps read it with
//! [`AddressRegistry::get`] instead of reaching back into the environment.

use alloy_primitives::Address;
use tracing::info;

use crate::{
    config::DeployConfig, constants::UNISWAP_V2_ROUTER_KEY, errors::ScriptError,
    registry::AddressRegistry,
};

/// Record the configured router address under [`UNISWAP_V2_ROUTER_KEY`].
///
/// Sends no transaction. Fails before writing anything if the router
/// address is not configured.
pub fn register_router(
    registry: &dyn AddressRegistry,
    config: &DeployConfig,
) -> Result<Address, ScriptError> {
    let router = config.router_address()?;
    registry.set(UNISWAP_V2_ROUTER_KEY, router)?;

    info!("### Uniswap V2 router registered at {router}");
    Ok(router)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::*;
    use crate::registry::MemoryRegistry;

    #[test]
    fn test_register_router() {
        let router = address!("7a250d5630b4cf539739df2c5dacb4c659f2488d");
        let config = DeployConfig::default().with_router_address(router);
        let registry = MemoryRegistry::new();

        assert_eq!(register_router(&registry, &config).unwrap(), router);
        assert_eq!(registry.get(UNISWAP_V2_ROUTER_KEY).unwrap(), router);
    }

    #[test]
    fn test_unset_router_writes_nothing() {
        let registry = MemoryRegistry::new();

        let res = register_router(&registry, &DeployConfig::default());
        assert!(matches!(res, Err(ScriptError::Configuration(_))));
        assert_eq!(registry.num_writes(), 0);
        assert!(matches!(
            registry.get(UNISWAP_V2_ROUTER_KEY),
            Err(ScriptError::MissingEntry(_))
        ));
    }
}
