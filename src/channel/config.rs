#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// incoming packets (including their envelope) that are bigger than this are treated as a
    ///  protocol violation, closing the channel
    pub max_packet_size: usize,
    /// number of bytes requested from the stream per read
    pub read_chunk_size: usize,
    /// capacity of the queue for unsolicited 'connection spawned' notifications on the client
    ///  side. The receive loop waits while the queue is full.
    pub notification_buffer_size: usize,
}

impl ChannelConfig {
    pub fn new() -> ChannelConfig {
        ChannelConfig {
            max_packet_size: 64*1024,
            read_chunk_size: 4096,
            notification_buffer_size: 32,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig::new()
    }
}
