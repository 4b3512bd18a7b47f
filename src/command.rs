//! JSON commands accepted by the control server.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::io::IoPort;
use crate::motor::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "device", rename_all = "lowercase")]
pub enum Command {
    Motor {
        index: usize,
        #[serde(default = "forward")]
        forward: bool,
        speed: i32,
    },
    Lamp {
        index: usize,
        brightness: i32,
    },
    Input {
        index: usize,
    },
    Refresh,
}

fn forward() -> bool {
    true
}

impl Command {
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).context("Malformed command")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reply", rename_all = "lowercase")]
pub enum Reply {
    Ok,
    Input {
        index: usize,
        digital: bool,
        analog: u16,
    },
    Refreshed {
        count: usize,
    },
}

impl<P: IoPort> Board<P> {
    pub fn execute(&mut self, command: Command) -> Result<Reply> {
        log::debug!("Executing {command:?}");
        match command {
            Command::Motor {
                index,
                forward,
                speed,
            } => {
                self.set_motor(index, Direction::from(forward), speed)?;
                Ok(Reply::Ok)
            }
            Command::Lamp { index, brightness } => {
                self.set_lamp(index, brightness)?;
                Ok(Reply::Ok)
            }
            Command::Input { index } => {
                let reading = self.read_input(index)?;
                Ok(Reply::Input {
                    index,
                    digital: reading.digital,
                    analog: reading.analog,
                })
            }
            Command::Refresh => Ok(Reply::Refreshed {
                count: self.refresh()?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::board::BoardLayout;
    use crate::pins::PinTable;
    use crate::sim::SimulatedIo;

    #[test]
    fn parses_commands() {
        assert_eq!(
            Command::parse(br#"{"device":"motor","index":1,"forward":false,"speed":5}"#).unwrap(),
            Command::Motor {
                index: 1,
                forward: false,
                speed: 5
            }
        );
        assert_eq!(
            Command::parse(br#"{"device":"motor","index":0,"speed":-3}"#).unwrap(),
            Command::Motor {
                index: 0,
                forward: true,
                speed: -3
            }
        );
        assert_eq!(
            Command::parse(br#"{"device":"lamp","index":6,"brightness":2}"#).unwrap(),
            Command::Lamp {
                index: 6,
                brightness: 2
            }
        );
        assert_eq!(Command::parse(br#"{"device":"refresh"}"#).unwrap(), Command::Refresh);
        assert!(Command::parse(br#"{"device":"servo","index":0}"#).is_err());
        assert!(Command::parse(b"speed=4").is_err());
    }

    #[test]
    fn replies_serialize_with_tag() {
        let reply = Reply::Input {
            index: 3,
            digital: true,
            analog: 17,
        };
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"reply":"input","index":3,"digital":true,"analog":17}"#
        );
        assert_eq!(serde_json::to_string(&Reply::Ok).unwrap(), r#"{"reply":"ok"}"#);
    }

    #[test]
    fn executes_against_board() {
        let mut board = Board::new(SimulatedIo::new(), &PinTable::FT_ESP32, BoardLayout::default()).unwrap();

        let command = Command::parse(br#"{"device":"motor","index":1,"forward":false,"speed":1}"#).unwrap();
        assert_eq!(board.execute(command).unwrap(), Reply::Ok);
        assert_eq!(board.io().duty(2), Some(223));
        assert_eq!(board.io().duty(3), Some(0));

        assert_eq!(
            board.execute(Command::Lamp { index: 7, brightness: 8 }).unwrap(),
            Reply::Ok
        );
        assert_eq!(board.io().duty(7), Some(0));

        assert_eq!(
            board.execute(Command::Refresh).unwrap(),
            Reply::Refreshed { count: 2 }
        );
        assert!(board.execute(Command::Lamp { index: 0, brightness: 1 }).is_err());

        board.io_mut().set_analog(39, 900);
        assert_eq!(
            board.execute(Command::Input { index: 1 }).unwrap(),
            Reply::Input {
                index: 1,
                digital: false,
                analog: 900
            }
        );
    }
}
