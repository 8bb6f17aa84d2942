// Clock abstraction shared by the live loop and the simulate command
pub mod source;
