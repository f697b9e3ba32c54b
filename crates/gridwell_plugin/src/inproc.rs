//! In-process plugin backend
//!
//! Modules are registered by name with a factory and instantiated on load.
//! Calls go straight into the module; host requests it issues are served
//! without any framing.

use std::fmt;
use std::sync::Arc;

use gridwell_bridge::exports;
use gridwell_bridge::{
    CallError, CallResult, CallReturn, ExportSignature, HostContext, PluginBackend, PluginModule,
};
use gridwell_core::TypedArg;
use rustc_hash::FxHashMap;

// ============================================================================
// Backend
// ============================================================================

pub struct InProcessBackend {
    module: Box<dyn PluginModule>,
    exports: Vec<ExportSignature>,
}

impl fmt::Debug for InProcessBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessBackend")
            .field("identity", &self.module.identity())
            .field("exports", &self.exports.len())
            .finish()
    }
}

impl InProcessBackend {
    pub fn new(module: Box<dyn PluginModule>) -> Self {
        let exports = module.exports();
        Self { module, exports }
    }

    pub fn identity(&self) -> &str {
        self.module.identity()
    }

    pub fn exports(&self) -> &[ExportSignature] {
        &self.exports
    }

    pub fn has_export(&self, name: &str) -> bool {
        exports::find(&self.exports, name).is_some()
    }
}

impl PluginBackend for InProcessBackend {
    fn kind(&self) -> &'static str {
        "in-process"
    }

    fn call(
        &mut self,
        ctx: &mut HostContext<'_>,
        function: &str,
        args: Vec<TypedArg>,
    ) -> CallResult<CallReturn> {
        let signature = exports::find(&self.exports, function)
            .ok_or_else(|| CallError::UnknownExport(function.to_owned()))?;
        let args = signature.check_args(args, ctx.state.coercion)?;
        let module = &mut self.module;
        ctx.scoped_call(|ctx| module.call(ctx, function, args))
    }
}

// ============================================================================
// Module registry
// ============================================================================

type ModuleFactory = Arc<dyn Fn() -> Box<dyn PluginModule> + Send + Sync>;

/// Named module factories.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    factories: FxHashMap<String, ModuleFactory>,
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; a later registration under the same name wins.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn PluginModule> + Send + Sync + 'static,
    {
        if self
            .factories
            .insert(name.to_owned(), Arc::new(factory))
            .is_some()
        {
            tracing::debug!(module = name, "module factory replaced");
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Instantiate the module registered as `name`.
    pub fn load(&self, name: &str) -> Option<InProcessBackend> {
        let factory = self.factories.get(name)?;
        let backend = InProcessBackend::new(factory());
        tracing::debug!(module = name, identity = backend.identity(), "module loaded");
        Some(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwell_bridge::{HostCalls, HostCallsExt, HostState, NoSubRender};
    use gridwell_core::ArgType;

    struct Echo;

    impl PluginModule for Echo {
        fn identity(&self) -> &str {
            "echo"
        }

        fn exports(&self) -> Vec<ExportSignature> {
            let mut e = exports::standard();
            e.push(ExportSignature::new(
                "scale",
                &[ArgType::Float32],
                Some(ArgType::Float32),
            ));
            e
        }

        fn call(
            &mut self,
            host: &mut dyn HostCalls,
            function: &str,
            args: Vec<TypedArg>,
        ) -> CallResult<Option<TypedArg>> {
            match function {
                "scale" => Ok(args[0].as_f32().map(|v| TypedArg::Float32(v * 2.0))),
                exports::SAVE => {
                    host.set_return(b"{\"n\":1}")?;
                    Ok(Some(TypedArg::Int64(1)))
                }
                _ => Ok(None),
            }
        }
    }

    fn registry() -> ModuleRegistry {
        let mut r = ModuleRegistry::new();
        r.register("echo", || Box::new(Echo));
        r
    }

    #[test]
    fn test_registry_load() {
        let r = registry();
        assert!(r.contains("echo"));
        assert!(r.load("missing").is_none());
        let backend = r.load("echo").unwrap();
        assert_eq!(backend.identity(), "echo");
        assert!(backend.has_export("scale"));
    }

    #[test]
    fn test_call_checks_and_coerces() {
        let mut state = HostState::default();
        let mut sub = NoSubRender;
        let mut backend = registry().load("echo").unwrap();
        let mut ctx = HostContext::new(&mut state, "echo", &mut sub);

        let ret = backend
            .call(&mut ctx, "scale", vec![TypedArg::Float32(1.5)])
            .unwrap();
        assert_eq!(ret.primary, Some(TypedArg::Float32(3.0)));

        let err = backend
            .call(&mut ctx, "scale", vec![TypedArg::Int64(3)])
            .unwrap_err();
        assert!(matches!(err, CallError::Argument { index: 0, .. }));

        ctx.state.coercion = gridwell_core::Coercion::Reinterpret;
        let bits = TypedArg::Int64(2.0f32.to_bits() as i64);
        let ret = backend.call(&mut ctx, "scale", vec![bits]).unwrap();
        assert_eq!(ret.primary, Some(TypedArg::Float32(4.0)));

        assert!(matches!(
            backend.call(&mut ctx, "nope", vec![]),
            Err(CallError::UnknownExport(_))
        ));
    }

    #[test]
    fn test_save_uses_secondary_return() {
        let mut state = HostState::default();
        let mut sub = NoSubRender;
        let mut backend = registry().load("echo").unwrap();
        let mut ctx = HostContext::new(&mut state, "echo", &mut sub);
        let ret = backend.call(&mut ctx, exports::SAVE, vec![]).unwrap();
        assert!(ret.handled());
        assert_eq!(ret.secondary, b"{\"n\":1}");
    }
}
