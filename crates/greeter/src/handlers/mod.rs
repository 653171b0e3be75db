//! One handler per Greeter method.

mod say_goodbye;
mod say_hello;

pub use say_goodbye::SayGoodbye;
pub use say_hello::SayHello;
