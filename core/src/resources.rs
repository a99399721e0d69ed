//! Read operations for each API resource.

use crate::client::ApiClient;
use crate::error::Result;
use crate::http::Transport;
use crate::types::{
    Educator, Envelope, Hub, ListEnvelope, LocationContact, Partner, Pod, School,
};

impl<T: Transport> ApiClient<T> {
    pub fn list_hubs(&self) -> Result<ListEnvelope<Hub>> {
        self.get_as("hubs", &[])
    }

    pub fn get_hub(&self, hub_id: &str) -> Result<Envelope<Hub>> {
        self.get_as(&format!("hubs/{hub_id}"), &[])
    }

    /// Partners serving as regional site entrepreneurs for the hub.
    pub fn get_hub_regional_site_entrepreneurs(
        &self,
        hub_id: &str,
    ) -> Result<ListEnvelope<Partner>> {
        self.get_as(&format!("hubs/{hub_id}/regional_site_entrepreneurs"), &[])
    }

    pub fn get_hub_pods(&self, hub_id: &str) -> Result<ListEnvelope<Pod>> {
        self.get_as(&format!("hubs/{hub_id}/pods"), &[])
    }

    pub fn get_hub_schools(&self, hub_id: &str) -> Result<ListEnvelope<School>> {
        self.get_as(&format!("hubs/{hub_id}/schools"), &[])
    }

    pub fn list_pods(&self) -> Result<ListEnvelope<Pod>> {
        self.get_as("pods", &[])
    }

    pub fn get_pod(&self, pod_id: &str) -> Result<Envelope<Pod>> {
        self.get_as(&format!("pods/{pod_id}"), &[])
    }

    pub fn list_partners(&self) -> Result<ListEnvelope<Partner>> {
        self.get_as("partners", &[])
    }

    pub fn get_partner(&self, partner_id: &str) -> Result<Envelope<Partner>> {
        self.get_as(&format!("partners/{partner_id}"), &[])
    }

    pub fn list_schools(&self) -> Result<ListEnvelope<School>> {
        self.get_as("schools", &[])
    }

    pub fn get_school(&self, school_id: &str) -> Result<Envelope<School>> {
        self.get_as(&format!("schools/{school_id}"), &[])
    }

    pub fn list_educators(&self) -> Result<ListEnvelope<Educator>> {
        self.get_as("educators", &[])
    }

    pub fn get_educator(&self, educator_id: &str) -> Result<Envelope<Educator>> {
        self.get_as(&format!("educators/{educator_id}"), &[])
    }

    pub fn list_location_contacts(&self) -> Result<ListEnvelope<LocationContact>> {
        self.get_as("location_contacts", &[])
    }

    pub fn get_location_contact(&self, location_contact_id: &str) -> Result<Envelope<LocationContact>> {
        self.get_as(&format!("location_contacts/{location_contact_id}"), &[])
    }

    /// The contact responsible for the area containing `address`.
    pub fn get_location_contact_for_address(
        &self,
        address: &str,
    ) -> Result<Envelope<LocationContact>> {
        self.get_as("location_contacts/contact_for_address", &[("address", address)])
    }
}
