//! Type-erased vendor resources.
//!
//! Device libraries outside the HAL park their own objects here to get a
//! generation-checked handle for them.

use std::any::Any;

use cobalt_common::hal::status::HalError;

use crate::registry::{HandleRegistry, VendorHandle};

impl HandleRegistry {
    /// Store `resource` and return its handle.
    ///
    /// # Errors
    /// `HalError::NoAvailableResources` when every vendor slot is in use.
    pub fn allocate_vendor<T: Any + Send + Sync>(&self, resource: T) -> Result<VendorHandle, HalError> {
        self.vendor.allocate(Box::new(resource))
    }

    /// Run `f` against the resource behind `handle`.
    ///
    /// # Errors
    /// `HalError::InvalidHandle` if the handle is stale or the resource is
    /// not a `T`.
    pub fn with_vendor<T: Any, R>(
        &self,
        handle: VendorHandle,
        f: impl FnOnce(&T) -> R,
    ) -> Result<R, HalError> {
        let resource = self.vendor.get(handle)?;
        let any: &(dyn Any + Send + Sync) = &**resource;
        let typed = any.downcast_ref::<T>().ok_or(HalError::InvalidHandle)?;
        Ok(f(typed))
    }

    /// Release a vendor resource. Stale handles are ignored.
    pub fn free_vendor(&self, handle: VendorHandle) {
        self.vendor.free(handle);
    }
}
