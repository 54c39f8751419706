/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::{
    schema_names::{wire_enum, WireEnum},
    MESSAGES_NS_URI, SOAP_NS_URI, TYPES_NS_URI,
};

wire_enum! {
    /// The XML namespaces used by EWS, keyed by the prefix we write them with.
    pub enum XmlNamespace {
        NotSpecified = "",
        Messages = "m",
        Types = "t",
        Errors = "e",
        Soap = "soap",
        XmlSchemaInstance = "xsi",
    }
}

impl XmlNamespace {
    pub fn prefix(self) -> &'static str {
        self.schema_name()
    }

    pub fn uri(self) -> &'static str {
        match self {
            XmlNamespace::NotSpecified => "",
            XmlNamespace::Messages => MESSAGES_NS_URI,
            XmlNamespace::Types => TYPES_NS_URI,
            XmlNamespace::Errors => crate::ERRORS_NS_URI,
            XmlNamespace::Soap => SOAP_NS_URI,
            XmlNamespace::XmlSchemaInstance => "http://www.w3.org/2001/XMLSchema-instance",
        }
    }
}

wire_enum! {
    /// The kind of a notification event.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/eventtypes>
    pub enum EventType {
        Status = "StatusEvent",
        NewMail = "NewMailEvent",
        Deleted = "DeletedEvent",
        Modified = "ModifiedEvent",
        Moved = "MovedEvent",
        Copied = "CopiedEvent",
        Created = "CreatedEvent",
        FreeBusyChanged = "FreeBusyChangedEvent" @ Exchange2010_SP1,
    }
}

wire_enum! {
    /// The well-known folders of a mailbox, addressed on the wire through a
    /// `DistinguishedFolderId`.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/distinguishedfolderid>
    pub enum WellKnownFolderName {
        Calendar = "calendar",
        Contacts = "contacts",
        DeletedItems = "deleteditems",
        Drafts = "drafts",
        Inbox = "inbox",
        Journal = "journal",
        Notes = "notes",
        Outbox = "outbox",
        SentItems = "sentitems",
        Tasks = "tasks",
        MsgFolderRoot = "msgfolderroot",
        PublicFoldersRoot = "publicfoldersroot",
        Root = "root",
        JunkEmail = "junkemail",
        SearchFolders = "searchfolders",
        VoiceMail = "voicemail",
        RecoverableItemsRoot = "recoverableitemsroot" @ Exchange2010_SP1,
        RecoverableItemsDeletions = "recoverableitemsdeletions" @ Exchange2010_SP1,
        RecoverableItemsVersions = "recoverableitemsversions" @ Exchange2010_SP1,
        RecoverableItemsPurges = "recoverableitemspurges" @ Exchange2010_SP1,
        ArchiveRoot = "archiveroot" @ Exchange2010_SP1,
        ArchiveMsgFolderRoot = "archivemsgfolderroot" @ Exchange2010_SP1,
        ArchiveDeletedItems = "archivedeleteditems" @ Exchange2010_SP1,
        ArchiveRecoverableItemsRoot = "archiverecoverableitemsroot" @ Exchange2010_SP1,
        SyncIssues = "syncissues" @ Exchange2013,
        Conflicts = "conflicts" @ Exchange2013,
        LocalFailures = "localfailures" @ Exchange2013,
        ServerFailures = "serverfailures" @ Exchange2013,
        RecipientCache = "recipientcache" @ Exchange2013,
        QuickContacts = "quickcontacts" @ Exchange2013,
        ConversationHistory = "conversationhistory" @ Exchange2013,
        ToDoSearch = "todosearch" @ Exchange2013,
    }
}

wire_enum! {
    /// The base set of properties returned for an object.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/baseshape>
    pub enum BasePropertySet {
        IdOnly,
        Default,
        FirstClassProperties = "AllProperties",
    }
}

wire_enum! {
    /// The format of an item body.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/bodytype>
    pub enum BodyType {
        Html = "HTML",
        Text,
        Best @ Exchange2013,
    }
}

wire_enum! {
    pub enum Importance {
        Low,
        Normal,
        High,
    }
}

wire_enum! {
    pub enum Sensitivity {
        Normal,
        Personal,
        Private,
        Confidential,
    }
}

wire_enum! {
    /// How items are removed by a `DeleteItem` operation.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/deleteitem#deletetype-attribute>
    pub enum DeleteMode {
        HardDelete,
        SoftDelete,
        MoveToDeletedItems,
    }
}

wire_enum! {
    /// How conflicting changes are handled by an `UpdateItem` operation.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/updateitem#conflictresolution-attribute>
    pub enum ConflictResolutionMode {
        NeverOverwrite,
        AutoResolve,
        AlwaysOverwrite,
    }
}

wire_enum! {
    /// What the server does with an email message after creating or updating
    /// it.
    ///
    /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/createitem#messagedisposition-attribute>
    pub enum MessageDisposition {
        SaveOnly,
        SendOnly,
        SendAndSaveCopy,
    }
}

wire_enum! {
    pub enum LegacyFreeBusyStatus {
        Free,
        Tentative,
        Busy,
        OOF,
        WorkingElsewhere @ Exchange2013,
        NoData,
    }
}
