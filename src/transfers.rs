use crate::archive::Section;
use crate::error::{Error, Result};
use crate::model::{parse_stop_code, StopRef};
use crate::registry::{trip_index, IdRegistry};
use std::io;
use tabular::Table;

struct Transfer {
    from: StopRef,
    to: StopRef,
    transfer_type: i32,
    min_transfer_time: i32,
}

struct TripTransfer {
    base: Transfer,
    from_trip: i32,
    to_trip: i32,
    max_waiting_time: i32,
}

/// `transfers` section. Rows split into stop-level transfers and trip-scoped
/// ones (those carrying a `from_trip_id`); each list is written
/// length-prefixed, stop-level first.
pub fn parse_and_write<R: io::Read>(
    table: &mut Table<R>,
    registry: &mut IdRegistry,
    section: &mut Section,
) -> Result<()> {
    let mut transfers = Vec::new();
    let mut trip_transfers = Vec::new();

    while let Some(row) = table.next_row()? {
        let base = Transfer {
            from: parse_stop_code(row.get_or("from_stop_id", ""), registry),
            to: parse_stop_code(row.get_or("to_stop_id", ""), registry),
            transfer_type: row.get_int("transfer_type").ok_or(Error::MissingField {
                column: "transfer_type",
            })?,
            min_transfer_time: row.get_int("min_transfer_time").ok_or(Error::MissingField {
                column: "min_transfer_time",
            })?,
        };

        if row.get_int_or("from_trip_id", -1) != -1 {
            trip_transfers.push(TripTransfer {
                base,
                from_trip: trip_index(row.get_int("from_trip_id").ok_or(Error::MissingField {
                    column: "from_trip_id",
                })?),
                to_trip: trip_index(row.get_int("to_trip_id").ok_or(Error::MissingField {
                    column: "to_trip_id",
                })?),
                max_waiting_time: row.get_int("max_waiting_time").ok_or(
                    Error::MissingField {
                        column: "max_waiting_time",
                    },
                )?,
            });
        } else {
            transfers.push(base);
        }
    }

    section.write_len(transfers.len())?;
    for transfer in &transfers {
        write_transfer(section, transfer)?;
    }

    section.write_len(trip_transfers.len())?;
    for transfer in &trip_transfers {
        write_transfer(section, &transfer.base)?;
        section.write_i32(transfer.from_trip)?;
        section.write_i32(transfer.to_trip)?;
        section.write_i16(transfer.max_waiting_time)?;
    }
    Ok(())
}

fn write_transfer(section: &mut Section, transfer: &Transfer) -> Result<()> {
    section.write_i16(transfer.from.stop)?;
    section.write_i16(transfer.from.platform)?;
    section.write_i16(transfer.to.stop)?;
    section.write_i16(transfer.to.platform)?;
    section.write_i8(transfer.transfer_type)?;
    section.write_i16(transfer.min_transfer_time)
}
