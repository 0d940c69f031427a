pub mod ctrl;
pub mod net;
pub mod proto;
pub mod queue;
pub mod scenario;
pub mod sim;
pub mod topo;

#[cfg(test)]
mod test;
