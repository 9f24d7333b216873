//! Proxy Registry
//!
//! Handle-based lifetime table for [`RenderProxy`]s. The registry owns every
//! proxy and its backend draw state; the rest of the engine holds
//! [`ProxyHandle`]s by value.
//!
//! Handles are `slotmap` keys: a slot reused after `destroy` gets a new
//! generation, so a stale handle resolves to `None` instead of aliasing the
//! new occupant.

use std::sync::Arc;

use slotmap::SlotMap;

use crate::errors::Result;
use crate::renderer::backend::RenderBackend;
use crate::renderer::proxy::{ProxyFlags, ProxyHandle, ProxyKind, RenderProxy};
use crate::resources::material::MaterialRef;
use crate::resources::mesh::Mesh;
use crate::scene::NodeKey;

#[derive(Debug, Default)]
pub struct ProxyRegistry {
    proxies: SlotMap<ProxyHandle, RenderProxy>,
}

impl ProxyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a proxy and its backend draw state.
    ///
    /// Fails only when the backend cannot allocate draw state; no slot is
    /// consumed in that case.
    pub fn create(
        &mut self,
        backend: &mut dyn RenderBackend,
        kind: ProxyKind,
        mesh: Option<Arc<Mesh>>,
        material: MaterialRef,
        node: NodeKey,
        flags: ProxyFlags,
    ) -> Result<ProxyHandle> {
        self.proxies.try_insert_with_key(|handle| {
            let draw_state = backend.create_draw_state(handle, kind, mesh.as_deref(), &material.read())?;
            Ok(RenderProxy {
                handle,
                kind,
                mesh,
                material,
                node,
                flags,
                draw_state,
            })
        })
    }

    /// Destroys a batch of proxies. Unknown or already destroyed handles are
    /// ignored. Returns how many proxies were actually destroyed.
    pub fn destroy(&mut self, backend: &mut dyn RenderBackend, handles: &[ProxyHandle]) -> usize {
        let mut destroyed = 0;
        for &handle in handles {
            if let Some(proxy) = self.proxies.remove(handle) {
                backend.release_draw_state(proxy.draw_state);
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Replaces a proxy's mesh and material and rebuilds its draw state.
    ///
    /// Returns `Ok(false)` for an unknown handle. On allocation failure the
    /// proxy keeps its previous mesh, material and draw state.
    pub fn rebuild(
        &mut self,
        backend: &mut dyn RenderBackend,
        handle: ProxyHandle,
        mesh: Option<Arc<Mesh>>,
        material: MaterialRef,
    ) -> Result<bool> {
        let Some(proxy) = self.proxies.get_mut(handle) else {
            return Ok(false);
        };
        let draw_state = backend.create_draw_state(handle, proxy.kind, mesh.as_deref(), &material.read())?;
        backend.release_draw_state(proxy.draw_state);
        proxy.draw_state = draw_state;
        proxy.mesh = mesh;
        proxy.material = material;
        Ok(true)
    }

    #[inline]
    #[must_use]
    pub fn resolve(&self, handle: ProxyHandle) -> Option<&RenderProxy> {
        self.proxies.get(handle)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: ProxyHandle) -> Option<&mut RenderProxy> {
        self.proxies.get_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, handle: ProxyHandle) -> bool {
        self.proxies.contains_key(handle)
    }

    #[must_use]
    pub fn handles_owned_by(&self, node: NodeKey) -> Vec<ProxyHandle> {
        self.proxies
            .iter()
            .filter(|(_, p)| p.node == node)
            .map(|(h, _)| h)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProxyHandle, &RenderProxy)> {
        self.proxies.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Destroys every proxy.
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        for (_, proxy) in self.proxies.drain() {
            backend.release_draw_state(proxy.draw_state);
        }
    }
}
