mod congestion;
mod queues;
mod scenario;
mod sender;
mod simulator;
mod timers;
