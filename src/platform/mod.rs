//! Platform services: CPU detection, shared listeners and process control.

mod unix;

pub use unix::{prepare_worker_command, process_alive, terminate_process};

use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpSocket};

/// Number of CPU cores available to this process.
pub fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn current_pid() -> u32 {
    std::process::id()
}

/// Bind a listener that several processes can hold on the same port.
///
/// On unix `SO_REUSEPORT` lets the kernel spread incoming connections across
/// every worker bound to `addr`.
pub fn bind_shared_listener(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuseport(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}
