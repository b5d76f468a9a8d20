use std::any::Any;

/// Upcast to `Any` so trait objects can be downcast to their concrete type.
///
/// Call it on `&dyn Trait`, never on a `Box<dyn Trait>`, or the box itself is what gets upcast.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
