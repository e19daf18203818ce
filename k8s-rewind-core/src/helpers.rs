use std::any::type_name;

use kube::Resource;

pub fn pretty_type_name<'a, T>() -> &'a str {
    type_name::<T>().split("::").last().unwrap_or("resource")
}

pub trait With<F> {
    fn with(self, op: F) -> Self;
}

impl<T, F> With<F> for T
where
    F: FnOnce(&mut Self),
{
    fn with(mut self, op: F) -> Self {
        op(&mut self);

        self
    }
}

pub trait AndIfSome<F, FC> {
    fn and_if_some(self, closure: FC, then: F) -> Self;
}

impl<T, TC, F, FC> AndIfSome<F, FC> for T
where
    F: FnOnce(Self, TC) -> Self,
    FC: FnOnce() -> Option<TC>,
{
    fn and_if_some(self, closure: FC, then: F) -> Self {
        let mut obj = self;
        if let Some(result) = closure() {
            obj = then(obj, result);
        }

        obj
    }
}

pub trait RequireMetadata<E> {
    fn require_uid_or_else(&self, error: impl FnOnce() -> E) -> Result<&str, E>;
}

impl<T: Resource, E> RequireMetadata<E> for T {
    fn require_uid_or_else(&self, error: impl FnOnce() -> E) -> Result<&str, E> {
        Ok(self.meta().uid.as_ref().ok_or_else(error)?.as_str())
    }
}
