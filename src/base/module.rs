use std::sync::Arc;
use crate::base::behavior::*;

#[derive(Debug)]
pub struct ModuleBase<T, C> {
    pub name: String,
    pub state: T,
    pub config: Option<Arc<C>>,
}

impl<T: Default, C> Default for ModuleBase<T, C> {
    fn default() -> Self {
        Self {
            name: String::new(),
            state: T::default(),
            config: None,
        }
    }
}

impl<T: Default, C> ModuleBase<T, C> {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

pub trait IsModule: ModuleBehaviors {
    type StateType;
    type ConfigType;

    fn base(&mut self) -> &mut ModuleBase<Self::StateType, Self::ConfigType>;

    fn base_ref(&self) -> &ModuleBase<Self::StateType, Self::ConfigType>;

    fn state_mut(&mut self) -> &mut Self::StateType {
        &mut self.base().state
    }

    fn state(&self) -> &Self::StateType {
        &self.base_ref().state
    }

    fn name(&self) -> &str {
        &self.base_ref().name
    }

    /// The shared configuration handle, for handing down to children.
    fn conf_arc(&self) -> Option<Arc<Self::ConfigType>> {
        self.base_ref().config.clone()
    }
}

impl<X> Parameterizable for X where X: IsModule {
    type ConfigType = X::ConfigType;

    fn conf(&self) -> &Self::ConfigType {
        self.base_ref().config.as_deref().expect("config not found, was `init_conf` called in `new`?")
    }

    fn init_conf(&mut self, conf: Arc<Self::ConfigType>) {
        assert!(self.base_ref().config.is_none(), "config already set");
        self.base().config = Some(conf);
    }

    fn refresh_conf(&mut self, conf: Arc<Self::ConfigType>) {
        self.base().config = Some(conf);
    }
}

/// arguments: identifier, state type, config type, additional methods
macro_rules! module {
    ($comp:ident, $T:ty, $C:ty, $($method:item)*) => {
        impl IsModule for $comp {
            type StateType = $T;
            type ConfigType = $C;

            fn base(&mut self) -> &mut ModuleBase<$T, $C> {
                &mut self.base
            }

            fn base_ref(&self) -> &ModuleBase<$T, $C> {
                &self.base
            }

            $($method)*
        }
    };
}

pub(crate) use module;
