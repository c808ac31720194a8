//! Pipe Channel
//!
//! Bidirectional transport between a parent process and one forked kitchen,
//! built on two unidirectional anonymous pipes. Frames are a `u32` length
//! header in host byte order followed by that many payload bytes.
//!
//! Receives are non-blocking: the read descriptor is switched to
//! `O_NONBLOCK` for the attempt and restored to its prior flags on exit, so
//! callers can poll the channel from an event loop. Sends block until the
//! whole frame has been accepted by the pipe.

use crate::{ChannelError, MAX_FRAME_SIZE};
use std::io;
use std::os::unix::io::RawFd;

const NO_FD: RawFd = -1;

/// One side of a parent<->child pipe pair.
///
/// Created with all four descriptors open, before `fork()`. After the fork
/// each side calls [`setup_parent`](PipeChannel::setup_parent) or
/// [`setup_child`](PipeChannel::setup_child) to drop the two ends it must
/// not hold.
pub struct PipeChannel {
    /// `[read, write]` ends of the parent-to-child pipe.
    parent_to_child: [RawFd; 2],
    /// `[read, write]` ends of the child-to-parent pipe.
    child_to_parent: [RawFd; 2],
    is_parent: bool,
    closed: bool,
}

impl PipeChannel {
    /// Allocate both pipes. The channel starts on the parent side.
    pub fn new() -> Result<Self, ChannelError> {
        let parent_to_child = create_pipe()?;
        let child_to_parent = match create_pipe() {
            Ok(fds) => fds,
            Err(e) => {
                close_fd(parent_to_child[0]);
                close_fd(parent_to_child[1]);
                return Err(e);
            }
        };

        Ok(Self {
            parent_to_child,
            child_to_parent,
            is_parent: true,
            closed: false,
        })
    }

    /// Keep write-to-child and read-from-child; close the duals.
    pub fn setup_parent(&mut self) {
        self.is_parent = true;
        close_fd(std::mem::replace(&mut self.parent_to_child[0], NO_FD));
        close_fd(std::mem::replace(&mut self.child_to_parent[1], NO_FD));
    }

    /// Keep read-from-parent and write-to-parent; close the duals.
    pub fn setup_child(&mut self) {
        self.is_parent = false;
        close_fd(std::mem::replace(&mut self.parent_to_child[1], NO_FD));
        close_fd(std::mem::replace(&mut self.child_to_parent[0], NO_FD));
    }

    fn write_fd(&self) -> RawFd {
        if self.is_parent {
            self.parent_to_child[1]
        } else {
            self.child_to_parent[1]
        }
    }

    fn read_fd(&self) -> RawFd {
        if self.is_parent {
            self.child_to_parent[0]
        } else {
            self.parent_to_child[0]
        }
    }

    /// Send one frame, blocking until the pipe has accepted all of it.
    pub fn send(&mut self, message: &str) -> Result<(), ChannelError> {
        if self.closed || self.write_fd() == NO_FD {
            return Err(ChannelError::Closed);
        }
        if message.len() > MAX_FRAME_SIZE {
            return Err(ChannelError::FrameTooLarge(message.len()));
        }

        let length = message.len() as u32;
        write_all(self.write_fd(), &length.to_ne_bytes())?;
        write_all(self.write_fd(), message.as_bytes())
    }

    /// Attempt to receive one frame without blocking.
    ///
    /// Returns `None` when no complete frame is available. A frame whose
    /// payload cannot be fully read is also reported as `None`; the stream
    /// may be desynchronized afterwards and every later receive will keep
    /// returning `None` until the channel is closed.
    pub fn receive(&mut self) -> Option<String> {
        if self.closed || self.read_fd() == NO_FD {
            return None;
        }

        let fd = self.read_fd();
        let prior_flags = set_nonblocking(fd)?;

        let result = read_frame(fd);

        // SAFETY: restoring the flag set we read before the attempt.
        unsafe { libc::fcntl(fd, libc::F_SETFL, prior_flags) };

        result
    }

    /// True while both endpoints this side owns remain open.
    pub fn is_ready(&self) -> bool {
        !self.closed && self.write_fd() != NO_FD && self.read_fd() != NO_FD
    }

    /// Close every still-open descriptor. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        close_fd(std::mem::replace(&mut self.parent_to_child[0], NO_FD));
        close_fd(std::mem::replace(&mut self.parent_to_child[1], NO_FD));
        close_fd(std::mem::replace(&mut self.child_to_parent[0], NO_FD));
        close_fd(std::mem::replace(&mut self.child_to_parent[1], NO_FD));
        self.closed = true;
    }
}

impl Drop for PipeChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn create_pipe() -> Result<[RawFd; 2], ChannelError> {
    let mut fds = [NO_FD; 2];
    // SAFETY: fds is a valid two-element array for pipe(2) to fill.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
        return Err(ChannelError::Create(io::Error::last_os_error()));
    }
    Ok(fds)
}

fn close_fd(fd: RawFd) {
    if fd != NO_FD {
        // SAFETY: fd was obtained from pipe(2) and is closed exactly once.
        unsafe { libc::close(fd) };
    }
}

/// Switch `fd` to non-blocking mode, returning the prior flag set.
fn set_nonblocking(fd: RawFd) -> Option<libc::c_int> {
    // SAFETY: querying and updating status flags on a descriptor we own.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
    if flags == -1 {
        return None;
    }
    unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    Some(flags)
}

fn read_frame(fd: RawFd) -> Option<String> {
    let mut header = [0u8; 4];
    if !read_exact(fd, &mut header) {
        return None;
    }

    let length = u32::from_ne_bytes(header) as usize;
    if length > MAX_FRAME_SIZE {
        return None;
    }

    let mut payload = vec![0u8; length];
    if !read_exact(fd, &mut payload) {
        return None;
    }

    String::from_utf8(payload).ok()
}

fn write_all(fd: RawFd, mut data: &[u8]) -> Result<(), ChannelError> {
    while !data.is_empty() {
        // SAFETY: writing from a live buffer to a descriptor we own.
        let written = unsafe { libc::write(fd, data.as_ptr().cast(), data.len()) };
        if written == -1 {
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EAGAIN) | Some(libc::EINTR) => continue,
                _ => return Err(ChannelError::Write(err)),
            }
        }
        data = &data[written as usize..];
    }
    Ok(())
}

fn read_exact(fd: RawFd, buf: &mut [u8]) -> bool {
    let mut filled = 0;
    while filled < buf.len() {
        // SAFETY: reading into a live buffer from a descriptor we own.
        let got = unsafe {
            libc::read(
                fd,
                buf[filled..].as_mut_ptr().cast(),
                buf.len() - filled,
            )
        };
        match got {
            -1 => {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                return false;
            }
            // Peer closed its end.
            0 => return false,
            n => filled += n as usize,
        }
    }
    true
}
