/// A named tuple of a producer and consumer, returned from `T::produce()` helpers for
/// convenience.
#[derive(Clone)]
pub struct Produce<P, C> {
	pub producer: P,
	pub consumer: C,
}

impl<P, C> Produce<P, C> {
	pub fn new(producer: P, consumer: C) -> Self {
		Self { producer, consumer }
	}
}
