use crate::data::CumulativePoint;

/// Dumps the series as `date,mileage,total_mileage` rows, one per day, figures rounded.
pub(crate) fn write_series<W: std::io::Write>(
    writer: W,
    series: &[CumulativePoint],
) -> Result<(), anyhow::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for point in series {
        wtr.serialize(point)?;
    }
    wtr.flush()?;
    Ok(())
}
