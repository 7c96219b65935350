pub mod channel;
pub mod codec;
pub mod packet;
pub mod record;
pub mod vsockets;
