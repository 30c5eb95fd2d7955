use std::cell::RefCell;
use std::rc::Rc;

/// A live, mutable simulation object shared between its owner, a
/// [`Logger`](super::logger::Logger) and an
/// [`Operations`](crate::operations::Operations) container.
pub type Shared<T> = Rc<RefCell<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Reference identity of a shared object.
///
/// Two handles compare equal only when they point at the same allocation,
/// never because the objects they hold compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn of<T: ?Sized>(object: &Rc<T>) -> Self {
        Self(Rc::as_ptr(object) as *const () as usize)
    }
}
