//! Region catalog and the naming corrections required by the HPMS portal.

use std::{collections::BTreeMap, fmt};

use thiserror::Error;

/// Display names of the regions published by the HPMS portal.
///
/// The list covers the fifty states plus the District of Columbia, in the
/// alphabetical order of their display names.
pub const UNITED_STATES: [&str; 51] = [
    "Alabama",
    "Alaska",
    "Arizona",
    "Arkansas",
    "California",
    "Colorado",
    "Connecticut",
    "Delaware",
    "District of Columbia",
    "Florida",
    "Georgia",
    "Hawaii",
    "Idaho",
    "Illinois",
    "Indiana",
    "Iowa",
    "Kansas",
    "Kentucky",
    "Louisiana",
    "Maine",
    "Maryland",
    "Massachusetts",
    "Michigan",
    "Minnesota",
    "Mississippi",
    "Missouri",
    "Montana",
    "Nebraska",
    "Nevada",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "New York",
    "North Carolina",
    "North Dakota",
    "Ohio",
    "Oklahoma",
    "Oregon",
    "Pennsylvania",
    "Rhode Island",
    "South Carolina",
    "South Dakota",
    "Tennessee",
    "Texas",
    "Utah",
    "Vermont",
    "Virginia",
    "Washington",
    "West Virginia",
    "Wisconsin",
    "Wyoming",
];

/// Region identifier as used by the portal: lower case, whitespace removed.
///
/// # Examples
/// ```
/// use hpms_core::Region;
///
/// let region = Region::new("District of Columbia");
/// assert_eq!(region.as_str(), "districtofcolumbia");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Region(String);

impl Region {
    /// Normalise a display name into a region identifier.
    pub fn new(name: &str) -> Self {
        Self(
            name.chars()
                .filter(|ch| !ch.is_whitespace())
                .flat_map(char::to_lowercase)
                .collect(),
        )
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Region {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Archive and shapefile names for a region that break the portal's pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileException {
    /// Download name the exception applies to.
    pub download_name: String,
    /// Publication year the exception applies to.
    pub year: u16,
    /// Archive stem used instead of `{download_name}{year}`.
    pub archive_stem: String,
    /// Shapefile name used instead of `{Name}_Sections.shp`.
    pub shapefile_name: String,
}

/// Errors raised while narrowing a [`RegionCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    /// The requested region is not part of the catalog.
    #[error("unknown region {name:?}")]
    Unknown {
        /// Name as supplied by the caller.
        name: String,
    },
}

/// Ordered region list plus the crosswalk and file exceptions.
///
/// # Examples
/// ```
/// use hpms_core::{Region, RegionCatalog};
///
/// let catalog = RegionCatalog::new(["wyoming", "districtofcolumbia"])
///     .with_crosswalk("districtofcolumbia", "district");
/// let dc = Region::new("districtofcolumbia");
/// assert_eq!(catalog.download_name(&dc), "district");
/// assert_eq!(catalog.regions().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionCatalog {
    regions: Vec<Region>,
    crosswalk: BTreeMap<Region, String>,
    exceptions: Vec<FileException>,
}

impl RegionCatalog {
    /// Build a catalog from region names, without corrections.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            regions: names
                .into_iter()
                .map(|name| Region::new(name.as_ref()))
                .collect(),
            crosswalk: BTreeMap::new(),
            exceptions: Vec::new(),
        }
    }

    /// The full portal catalog with its known corrections.
    ///
    /// The District of Columbia is published as `district`, and the 2015
    /// Missouri release ships as `missouri2015t.zip` containing
    /// `Missouri_Sectionst.shp`.
    pub fn united_states() -> Self {
        Self::new(UNITED_STATES)
            .with_crosswalk("districtofcolumbia", "district")
            .with_exception(FileException {
                download_name: "missouri".to_owned(),
                year: 2015,
                archive_stem: "missouri2015t".to_owned(),
                shapefile_name: "Missouri_Sectionst.shp".to_owned(),
            })
    }

    /// Publish `region` under `download_name` instead of its identifier.
    #[must_use]
    pub fn with_crosswalk(mut self, region: &str, download_name: &str) -> Self {
        self.crosswalk
            .insert(Region::new(region), download_name.to_owned());
        self
    }

    /// Register an archive or shapefile naming exception.
    #[must_use]
    pub fn with_exception(mut self, exception: FileException) -> Self {
        self.exceptions.push(exception);
        self
    }

    /// Regions in catalog order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Name used in the download URL for `region`.
    pub fn download_name<'a>(&'a self, region: &'a Region) -> &'a str {
        self.crosswalk
            .get(region)
            .map_or_else(|| region.as_str(), String::as_str)
    }

    /// Exception registered for `download_name` in `year`, if any.
    pub fn exception(&self, download_name: &str, year: u16) -> Option<&FileException> {
        self.exceptions
            .iter()
            .find(|entry| entry.year == year && entry.download_name == download_name)
    }

    /// Keep only the named regions, preserving catalog order.
    ///
    /// Names match either the region identifier or its download name, so both
    /// `"District of Columbia"` and `"district"` select the same region. An
    /// empty selection keeps the whole catalog.
    pub fn restrict<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self, RegionError> {
        if names.is_empty() {
            return Ok(self);
        }
        let wanted: Vec<Region> = names.iter().map(|name| Region::new(name.as_ref())).collect();
        if let Some((index, _)) = wanted
            .iter()
            .enumerate()
            .find(|(_, wanted)| !self.regions.iter().any(|region| self.matches(region, wanted)))
        {
            let name = names
                .get(index)
                .map_or_else(String::new, |name| name.as_ref().to_owned());
            return Err(RegionError::Unknown { name });
        }
        let selected = self
            .regions
            .iter()
            .filter(|region| wanted.iter().any(|wanted| self.matches(region, wanted)))
            .cloned()
            .collect();
        self.regions = selected;
        Ok(self)
    }

    fn matches(&self, region: &Region, wanted: &Region) -> bool {
        region == wanted || self.download_name(region) == wanted.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("New York", "newyork")]
    #[case("District of Columbia", "districtofcolumbia")]
    #[case("wyoming", "wyoming")]
    fn normalises_display_names(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(Region::new(name).as_str(), expected);
    }

    #[rstest]
    fn united_states_lists_states_and_district() {
        let catalog = RegionCatalog::united_states();
        assert_eq!(catalog.regions().len(), 51);
        assert_eq!(
            catalog.regions().first().map(Region::as_str),
            Some("alabama")
        );
        assert_eq!(
            catalog.regions().last().map(Region::as_str),
            Some("wyoming")
        );
    }

    #[rstest]
    fn crosswalk_renames_district() {
        let catalog = RegionCatalog::united_states();
        let dc = Region::new("District of Columbia");
        assert_eq!(catalog.download_name(&dc), "district");
        let ohio = Region::new("Ohio");
        assert_eq!(catalog.download_name(&ohio), "ohio");
    }

    #[rstest]
    #[case(2015, true)]
    #[case(2016, false)]
    fn missouri_exception_is_year_specific(#[case] year: u16, #[case] expected: bool) {
        let catalog = RegionCatalog::united_states();
        assert_eq!(catalog.exception("missouri", year).is_some(), expected);
    }

    #[rstest]
    fn restrict_preserves_catalog_order() {
        let catalog = RegionCatalog::united_states()
            .restrict(&["Wyoming", "district", "alabama"])
            .expect("known regions");
        let names: Vec<&str> = catalog.regions().iter().map(Region::as_str).collect();
        assert_eq!(names, ["alabama", "districtofcolumbia", "wyoming"]);
    }

    #[rstest]
    fn restrict_rejects_unknown_regions() {
        let err = RegionCatalog::united_states()
            .restrict(&["ohio", "atlantis"])
            .expect_err("atlantis is not a region");
        assert_eq!(
            err,
            RegionError::Unknown {
                name: "atlantis".to_owned()
            }
        );
    }

    #[rstest]
    fn empty_restriction_keeps_everything() {
        let names: [&str; 0] = [];
        let catalog = RegionCatalog::united_states()
            .restrict(&names)
            .expect("empty selection");
        assert_eq!(catalog.regions().len(), 51);
    }
}
