//! `Processor` — a single pipeline step
//!
//! A processor mutates the context and has no control-flow effect of its own.
//! Control flow belongs to [`Rule`](crate::Rule)s.

use crate::{MetaData, PipelineError};
use std::fmt;

/// One step of a chain.
///
/// Processors are shared by every concurrent run of a [`ChainRegistry`](crate::ChainRegistry),
/// so they take `&self`. A processor touching genuinely shared external state
/// handles its own synchronization.
///
/// # Example
///
/// ```
/// use chainer::{MetaData, MetaDataKey, PipelineError, Processor};
///
/// #[derive(Debug)]
/// struct SetStatus {
///     key: MetaDataKey<u16>,
///     status: u16,
/// }
///
/// impl Processor for SetStatus {
///     fn apply(&self, meta_data: &mut MetaData) -> Result<(), PipelineError> {
///         meta_data.set(&self.key, self.status);
///         Ok(())
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Processor`",
    label = "this type cannot be appended to a chain",
    note = "wrap closures with `processor_fn(name, |meta_data| ...)`"
)]
pub trait Processor: Send + Sync + fmt::Debug {
    /// Apply this step to the context.
    ///
    /// # Errors
    ///
    /// Any error aborts the current run immediately.
    fn apply(&self, meta_data: &mut MetaData) -> Result<(), PipelineError>;

    /// Name shown in dumps, traces and logs. Defaults to the type's short name.
    fn name(&self) -> String {
        short_type_name::<Self>().to_owned()
    }
}

#[diagnostic::do_not_recommend]
impl Processor for Box<dyn Processor> {
    fn apply(&self, meta_data: &mut MetaData) -> Result<(), PipelineError> {
        (**self).apply(meta_data)
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

/// Closure-backed processor. Build with [`processor_fn`].
pub struct FnProcessor<F> {
    name: String,
    apply: F,
}

impl<F> Processor for FnProcessor<F>
where
    F: Fn(&mut MetaData) -> Result<(), PipelineError> + Send + Sync,
{
    fn apply(&self, meta_data: &mut MetaData) -> Result<(), PipelineError> {
        (self.apply)(meta_data)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

impl<F> fmt::Debug for FnProcessor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnProcessor").field(&self.name).finish()
    }
}

/// Turn a closure into a named [`Processor`].
///
/// ```
/// use chainer::{processor_fn, MetaData, MetaDataKey, Processor};
///
/// let status = MetaDataKey::<u16>::new("response.status");
/// let key = status.clone();
/// let ok = processor_fn("set status 200", move |md| {
///     md.set(&key, 200);
///     Ok(())
/// });
///
/// let mut md = MetaData::new();
/// ok.apply(&mut md).unwrap();
/// assert_eq!(md.get(&status), Ok(&200));
/// assert_eq!(ok.name(), "set status 200");
/// ```
pub fn processor_fn<F>(name: impl Into<String>, apply: F) -> FnProcessor<F>
where
    F: Fn(&mut MetaData) -> Result<(), PipelineError> + Send + Sync,
{
    FnProcessor {
        name: name.into(),
        apply,
    }
}

/// `a::b::Foo<c::Bar>` → `Foo`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
